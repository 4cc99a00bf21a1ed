mod common;

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use scopechart::{BinaryOp, FilterKind, Plot, Subtract};

    use crate::common::plot_on_screen;

    fn counter_dataset(values: &[f64]) -> Plot {
        let mut pl = Plot::default();
        pl.data_alloc(0, 1, 64.max(values.len()));

        for &v in values {
            pl.data_insert(0, &[v]);
        }

        pl
    }

    #[test]
    fn test_time_unwrap_counter_reconstruction() {
        let mut pl = counter_dataset(&[0.0, 1.0, 2.0, 0.0, 1.0, 2.0]);

        let c = pl.get_subtract_time_unwrap(0, 0).expect("free slot");

        for id in 0..6 {
            assert_eq!(pl.data_cell(0, id, c), Some(id as f64), "row {id}");
        }
    }

    #[test]
    fn test_time_unwrap_is_monotonic_over_random_wraps() {
        let mut rng = StdRng::seed_from_u64(23);
        let mut values = Vec::new();
        let mut t = 0.0;

        for _ in 0..500 {
            t += rng.gen_range(0.0..0.3);
            if rng.gen_bool(0.05) {
                t = 0.0;
            }
            values.push(t);
        }

        let mut pl = counter_dataset(&values);
        let c = pl.get_subtract_time_unwrap(0, 0).unwrap();

        let mut prev = f64::NEG_INFINITY;
        for id in 0..values.len() as i64 {
            let v = pl.data_cell(0, id, c).unwrap();
            assert!(v >= prev, "row {id}: {v} < {prev}");
            prev = v;
        }
    }

    #[test]
    fn test_scale_is_affine_and_keeps_nan() {
        let mut pl = counter_dataset(&[1.0, f64::NAN, 3.0]);

        let c = pl.get_subtract_scale(0, 0, 2.0, 5.0).unwrap();

        assert_eq!(pl.data_cell(0, 0, c), Some(7.0));
        assert!(pl.data_cell(0, 1, c).unwrap().is_nan());
        assert_eq!(pl.data_cell(0, 2, c), Some(11.0));
    }

    #[test]
    fn test_scale_and_unwrap_slots_are_deduplicated() {
        let mut pl = counter_dataset(&[1.0, 2.0, 3.0]);

        let a = pl.get_subtract_scale(0, 0, 2.0, 5.0).unwrap();
        let b = pl.get_subtract_scale(0, 0, 2.0, 5.0).unwrap();
        let c = pl.get_subtract_scale(0, 0, 2.0, 6.0).unwrap();

        assert_eq!(a, b, "identical parameters must reuse the slot");
        assert_ne!(a, c, "different parameters must not");

        let u1 = pl.get_subtract_time_unwrap(0, 0).unwrap();
        let u2 = pl.get_subtract_time_unwrap(0, 0).unwrap();
        assert_eq!(u1, u2);
    }

    #[test]
    fn test_binary_operators() {
        let mut pl = Plot::default();
        pl.data_alloc(0, 2, 16);
        pl.data_insert(0, &[3.0, 4.0]);
        pl.data_insert(0, &[-1.0, 1.0]);

        let sub = pl.get_subtract_binary(0, BinaryOp::Sub, 0, 1).unwrap();
        let add = pl.get_subtract_binary(0, BinaryOp::Add, 0, 1).unwrap();
        let mul = pl.get_subtract_binary(0, BinaryOp::Mul, 0, 1).unwrap();
        let hyp = pl.get_subtract_binary(0, BinaryOp::Hyp, 0, 1).unwrap();

        assert_eq!(pl.data_cell(0, 0, sub), Some(-1.0));
        assert_eq!(pl.data_cell(0, 0, add), Some(7.0));
        assert_eq!(pl.data_cell(0, 0, mul), Some(12.0));
        assert_eq!(pl.data_cell(0, 0, hyp), Some(5.0));

        assert_eq!(pl.data_cell(0, 1, sub), Some(-2.0));
    }

    #[test]
    fn test_cumulative_filter_ignores_non_finite() {
        let mut pl = plot_on_screen();
        pl.data_alloc(0, 2, 64);

        let inputs = [1.0, 2.0, f64::NAN, 4.0, f64::INFINITY, 8.0];
        for (n, &v) in inputs.iter().enumerate() {
            pl.data_insert(0, &[n as f64, v]);
        }

        pl.figure_add(0, 0, 0, 1, 0, 1, "");
        pl.figure_subtract_filter(0, FilterKind::Cum, 0.0, 0.0);

        let fig = pl.figure_ref(1).expect("derived figure");
        assert!(fig.is_busy());
        let (_, _, c, _, _) = fig.binding();

        let expected = [1.0, 3.0, 3.0, 7.0, 7.0, 15.0];
        for (id, &want) in expected.iter().enumerate() {
            assert_eq!(pl.data_cell(0, id as i64, c), Some(want), "row {id}");
        }
    }

    #[test]
    fn test_difference_filter() {
        let mut pl = plot_on_screen();
        pl.data_alloc(0, 2, 64);

        for (n, v) in [5.0, 7.0, 4.0].into_iter().enumerate() {
            pl.data_insert(0, &[n as f64, v]);
        }

        pl.figure_add(0, 0, 0, 1, 0, 1, "");
        pl.figure_subtract_filter(0, FilterKind::Diff, 0.0, 0.0);

        let (_, _, c, _, _) = pl.figure_ref(1).unwrap().binding();

        // First output differences against the NaN seed.
        assert!(pl.data_cell(0, 0, c).unwrap().is_nan());
        assert_eq!(pl.data_cell(0, 1, c), Some(2.0));
        assert_eq!(pl.data_cell(0, 2, c), Some(-3.0));
    }

    #[test]
    fn test_lowpass_filter_initializes_on_first_finite() {
        let mut pl = plot_on_screen();
        pl.data_alloc(0, 2, 64);

        for (n, v) in [f64::NAN, 10.0, 0.0, 0.0].into_iter().enumerate() {
            pl.data_insert(0, &[n as f64, v]);
        }

        pl.figure_add(0, 0, 0, 1, 0, 1, "");
        pl.figure_subtract_filter(0, FilterKind::LowPass, 0.5, 0.0);

        let (_, _, c, _, _) = pl.figure_ref(1).unwrap().binding();

        assert!(pl.data_cell(0, 0, c).unwrap().is_nan());
        assert_eq!(pl.data_cell(0, 1, c), Some(10.0));
        assert_eq!(pl.data_cell(0, 2, c), Some(5.0));
        assert_eq!(pl.data_cell(0, 3, c), Some(2.5));
    }

    #[test]
    fn test_bitmask_filter_extracts_field() {
        let mut pl = plot_on_screen();
        pl.data_alloc(0, 2, 64);

        // 0b1101_0110 with bits 2..=5 -> 0b0101 = 5.
        pl.data_insert(0, &[0.0, 214.0]);

        pl.figure_add(0, 0, 0, 1, 0, 1, "");
        pl.figure_subtract_filter(0, FilterKind::Bitmask, 2.0, 5.0);

        let (_, _, c, _, _) = pl.figure_ref(1).unwrap().binding();
        assert_eq!(pl.data_cell(0, 0, c), Some(5.0));
    }

    #[test]
    fn test_incremental_pass_matches_batch_recompute() {
        let stream: Vec<f64> = (0..40).map(|n| ((n % 7) as f64) * 0.25).collect();

        // Batch: everything inserted first, one full recompute.
        let mut batch = counter_dataset(&stream);
        let c = batch.get_subtract_time_unwrap(0, 0).unwrap();

        // Streamed: the slot exists from the start and is extended by
        // the unbounded pass after every burst.
        let mut live = counter_dataset(&stream[..5]);
        let c_live = live.get_subtract_time_unwrap(0, 0).unwrap();
        assert_eq!(c, c_live);

        for burst in stream[5..].chunks(7) {
            for &v in burst {
                live.data_insert(0, &[v]);
            }
            live.data_subtract(0, -1);
        }

        for id in 0..stream.len() as i64 {
            assert_eq!(
                live.data_cell(0, id, c),
                batch.data_cell(0, id, c),
                "row {id}"
            );
        }
    }

    #[test]
    fn test_resample_then_subtract_across_datasets() {
        let mut pl = plot_on_screen();

        pl.data_alloc(0, 2, 16);
        pl.data_insert(0, &[0.0, 0.0]);
        pl.data_insert(0, &[1.0, 10.0]);

        pl.data_alloc(1, 2, 16);
        pl.data_insert(1, &[0.5, 5.0]);

        pl.figure_add(0, 0, 0, 1, 0, 1, "");
        pl.figure_add(1, 1, 0, 1, 0, 2, "");
        pl.layout(&crate::common::FixedFont);

        pl.figure_subtract_switch(BinaryOp::Sub);

        let combo = pl.figure_ref(2).expect("combined figure");
        assert!(combo.is_busy());
        let (d, _, c, _, _) = combo.binding();
        assert_eq!(d, 0);

        // Boundary holds the last valid sample of the source.
        assert_eq!(pl.data_cell(0, 0, c), Some(-5.0));
        assert_eq!(pl.data_cell(0, 1, c), Some(5.0));

        // The sources are hidden, the result is visible.
        assert!(pl.figure_ref(0).unwrap().is_hidden());
        assert!(pl.figure_ref(1).unwrap().is_hidden());
        assert!(!pl.figure_ref(2).unwrap().is_hidden());
    }

    #[test]
    fn test_switch_toggles_back_to_sources() {
        let mut pl = plot_on_screen();

        pl.data_alloc(0, 3, 16);
        pl.data_insert(0, &[0.0, 1.0, 4.0]);
        pl.data_insert(0, &[1.0, 2.0, 3.0]);

        pl.figure_add(0, 0, 0, 1, 0, 1, "");
        pl.figure_add(1, 0, 0, 2, 0, 2, "");

        pl.figure_subtract_switch(BinaryOp::Sub);
        assert!(pl.figure_ref(0).unwrap().is_hidden());

        // One visible combined figure left; switching again restores
        // the sources without creating new derived state.
        let slots_used = pl
            .dataset(0)
            .unwrap()
            .subtracts()
            .iter()
            .filter(|s| !s.is_free())
            .count();

        pl.figure_subtract_switch(BinaryOp::Sub);

        assert!(!pl.figure_ref(0).unwrap().is_hidden());
        assert!(!pl.figure_ref(1).unwrap().is_hidden());
        assert!(pl.figure_ref(2).unwrap().is_hidden());

        let slots_after = pl
            .dataset(0)
            .unwrap()
            .subtracts()
            .iter()
            .filter(|s| !s.is_free())
            .count();

        assert_eq!(slots_used, slots_after);
    }

    #[test]
    fn test_garbage_sweep_frees_unreferenced_slots() {
        let mut pl = plot_on_screen();
        pl.data_alloc(0, 2, 64);

        for n in 0..8 {
            pl.data_insert(0, &[n as f64, (n * n) as f64]);
        }

        pl.figure_add(0, 0, 0, 1, 0, 1, "");
        pl.figure_subtract_filter(0, FilterKind::Diff, 0.0, 0.0);

        let used = |pl: &Plot| {
            pl.dataset(0)
                .unwrap()
                .subtracts()
                .iter()
                .filter(|s| !s.is_free())
                .count()
        };

        assert_eq!(used(&pl), 1);

        pl.figure_remove(1);

        assert_eq!(used(&pl), 0, "slot must be swept with its figure");
        assert!(matches!(
            pl.dataset(0).unwrap().subtracts()[0],
            Subtract::Free
        ));
    }
}
