mod common;

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use scopechart::Plot;

    use crate::common::plot_on_screen;

    #[test]
    fn test_range_covers_finite_values_only() {
        let mut pl = Plot::default();
        pl.data_alloc(0, 1, 16);

        for v in [f64::NAN, 2.0, f64::INFINITY, -4.0, 2.5] {
            pl.data_insert(0, &[v]);
        }

        assert_eq!(pl.data_range(0, 0), (-4.0, 2.5));
    }

    #[test]
    fn test_range_follows_insert_invalidation() {
        let mut pl = Plot::default();
        pl.data_alloc(0, 1, 64);

        for v in [5.0, 1.0, 3.0] {
            pl.data_insert(0, &[v]);
        }

        assert_eq!(pl.data_range(0, 0), (1.0, 5.0));

        // The cached aggregate must not survive the write.
        pl.data_insert(0, &[9.0]);
        assert_eq!(pl.data_range(0, 0), (1.0, 9.0));

        pl.data_insert(0, &[-2.0]);
        assert_eq!(pl.data_range(0, 0), (-2.0, 9.0));
    }

    #[test]
    fn test_range_forgets_evicted_rows() {
        let mut pl = Plot::default();
        pl.data_alloc(0, 1, 4);

        for v in [5.0, 1.0, 9.0, 3.0] {
            pl.data_insert(0, &[v]);
        }

        assert_eq!(pl.data_range(0, 0), (1.0, 9.0));

        // Overflow evicts 5 and 1.
        pl.data_insert(0, &[7.0]);
        pl.data_insert(0, &[8.0]);

        assert_eq!(pl.data_range(0, 0), (3.0, 9.0));
    }

    #[test]
    fn test_range_matches_direct_scan_on_random_streams() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut pl = Plot::default();
        pl.data_alloc(0, 1, 3000);

        let mut live = Vec::new();

        for _ in 0..5000 {
            let v = if rng.gen_bool(0.02) {
                f64::NAN
            } else {
                rng.gen_range(-1e3..1e3)
            };

            pl.data_insert(0, &[v]);
            live.push(v);

            if live.len() > 3000 {
                live.remove(0);
            }
        }

        let fmin = live.iter().copied().filter(|v| v.is_finite()).fold(f64::INFINITY, f64::min);
        let fmax = live
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);

        assert_eq!(pl.data_range(0, 0), (fmin, fmax));
    }

    #[test]
    fn test_range_of_row_index_column() {
        let mut pl = Plot::default();
        pl.data_alloc(0, 1, 8);

        for n in 0..12 {
            pl.data_insert(0, &[n as f64]);
        }

        // Ids 4..=11 are live after four evictions.
        assert_eq!(pl.data_range(0, -1), (4.0, 11.0));
    }

    #[test]
    fn test_range_across_chunk_boundaries() {
        let mut pl = Plot::default();
        pl.data_alloc(0, 1, 5000);

        // Minimum sits deep in the first chunk, maximum in the last.
        for n in 0..5000 {
            let v = match n {
                100 => -500.0,
                4800 => 500.0,
                _ => (n % 10) as f64,
            };
            pl.data_insert(0, &[v]);
        }

        assert_eq!(pl.data_range(0, 0), (-500.0, 500.0));

        // A second fetch is served from the cache and must agree.
        assert_eq!(pl.data_range(0, 0), (-500.0, 500.0));
    }

    #[test]
    fn test_conditional_autoscale_uses_visible_rows_only() {
        let mut pl = plot_on_screen();
        pl.data_alloc(0, 3, 128);

        // Column 1 ramps 0..100; column 2 is huge on the first half
        // and tiny on the second.
        for n in 0..100 {
            let spike = if n < 50 { 100.0 } else { (n % 2) as f64 * 2.0 - 1.0 };
            pl.data_insert(0, &[n as f64, n as f64, spike]);
        }

        pl.figure_add(0, 0, 0, 1, 0, 1, "");
        pl.figure_add(1, 0, 0, 2, 0, 2, "");
        pl.layout(&crate::common::FixedFont);

        // Zoom X onto the second half, then conditionally rescale the
        // second figure's Y axis.
        pl.axis_scale_manual(0, 50.0, 99.0);
        pl.axis_scale_auto_cond(2, Some(0));

        let (scale, offset) = pl.axis_ref(2).unwrap().scale_offset();
        let fmin = -offset / scale;
        let fmax = 1.0 / scale + fmin;

        assert!(fmin > -5.0, "spikes outside the view leaked in: {fmin}");
        assert!(fmax < 5.0, "spikes outside the view leaked in: {fmax}");
        assert!(fmin <= -1.0 && fmax >= 1.0, "visible rows must be covered");
    }

    #[test]
    fn test_unconditional_autoscale_covers_everything() {
        let mut pl = plot_on_screen();
        pl.data_alloc(0, 2, 128);

        for n in 0..100 {
            pl.data_insert(0, &[n as f64, (n as f64) - 50.0]);
        }

        pl.figure_add(0, 0, 0, 1, 0, 1, "");
        pl.layout(&crate::common::FixedFont);

        pl.axis_scale_auto(1);

        let (scale, offset) = pl.axis_ref(1).unwrap().scale_offset();
        let fmin = -offset / scale;
        let fmax = 1.0 / scale + fmin;

        assert!(fmin <= -50.0 && fmax >= 49.0);
        // The inset must not balloon the range.
        assert!(fmax - fmin < 110.0);
    }
}
