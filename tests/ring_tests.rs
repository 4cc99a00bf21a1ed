mod common;

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use scopechart::{PlotOptions, Plot};

    #[test]
    fn test_ring_overflow_keeps_newest_rows() {
        let mut pl = Plot::default();
        pl.data_alloc(0, 1, 4);

        for v in 1..=5 {
            pl.data_insert(0, &[v as f64]);
        }

        let data = pl.dataset(0).expect("dataset 0 allocated");
        assert_eq!(data.rows(), 4);
        assert_eq!(data.head_id(), 1, "one eviction must have happened");

        // Rows [2, 3, 4, 5] under ids 1..=4.
        for id in 1..=4 {
            let v = pl.data_cell(0, id, 0);
            assert_eq!(v, Some((id + 1) as f64), "row id {id}");
        }

        // The evicted row is gone.
        assert_eq!(pl.data_cell(0, 0, 0), None);
    }

    #[test]
    fn test_logical_ids_after_random_churn() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut pl = Plot::default();
        pl.data_alloc(0, 1, 100);

        let mut total = 0i64;

        for _ in 0..1000 {
            let burst = rng.gen_range(1..20);

            for _ in 0..burst {
                pl.data_insert(0, &[total as f64]);
                total += 1;
            }

            let data = pl.dataset(0).unwrap();
            assert_eq!(data.rows() as i64, total.min(100));
            assert_eq!(data.head_id(), total - data.rows() as i64);
        }

        // Every live row still holds its own id as the value.
        let head = pl.dataset(0).unwrap().head_id();
        for id in head..total {
            assert_eq!(pl.data_cell(0, id, 0), Some(id as f64));
        }
    }

    #[test]
    fn test_space_left_and_grow() {
        let mut pl = Plot::default();
        pl.data_alloc(0, 2, 100);

        assert_eq!(pl.data_space_left(0), 100);

        for n in 0..30 {
            pl.data_insert(0, &[n as f64, 0.0]);
        }

        assert_eq!(pl.data_space_left(0), 70);

        let before = pl.dataset(0).unwrap().length();
        pl.data_grow_up(0);
        let after = pl.dataset(0).unwrap().length();

        assert!(after > before, "grow must extend the ring");
        assert_eq!(pl.dataset(0).unwrap().rows(), 30, "content survives growth");
    }

    #[test]
    fn test_resize_reduction_resets_content() {
        let mut pl = Plot::default();
        pl.data_alloc(0, 1, 100);

        for n in 0..50 {
            pl.data_insert(0, &[n as f64]);
        }

        pl.data_resize(0, 10);

        let data = pl.dataset(0).unwrap();
        assert_eq!(data.rows(), 0);
        assert_eq!(data.head_id(), 0);
    }

    #[test]
    fn test_column_count_is_sticky() {
        let mut pl = Plot::default();
        pl.data_alloc(0, 3, 100);
        pl.data_insert(0, &[1.0, 2.0, 3.0]);

        // Rejected, logged, no-op.
        pl.data_alloc(0, 4, 100);
        assert_eq!(pl.dataset(0).unwrap().column_n(), 3);
        assert_eq!(pl.dataset(0).unwrap().rows(), 1);

        // Same width resets the content instead.
        pl.data_alloc(0, 3, 100);
        assert_eq!(pl.dataset(0).unwrap().rows(), 0);
    }

    #[test]
    fn test_clean_releases_the_slot() {
        let mut pl = Plot::default();
        pl.data_alloc(0, 2, 64);
        pl.data_insert(0, &[1.0, 2.0]);

        pl.data_clean(0);
        assert!(pl.dataset(0).is_none());

        // A different width is fine after clean.
        pl.data_alloc(0, 5, 64);
        assert_eq!(pl.dataset(0).unwrap().column_n(), 5);
    }

    #[test]
    fn test_compressed_store_roundtrip() {
        let mut opt = PlotOptions::default();
        opt.compress = true;

        let mut pl = Plot::new(opt);
        pl.data_alloc(0, 1, 12000);

        // Spans more chunks than the decompressed cache holds, so
        // eviction, compression and refetch all happen.
        for n in 0..12000 {
            pl.data_insert(0, &[n as f64]);
        }

        for id in (0..12000).step_by(997) {
            assert_eq!(pl.data_cell(0, id, 0), Some(id as f64), "row id {id}");
        }

        assert!(pl.data_memory_usage(0) > 0);
        assert!(pl.data_memory_uncompressed(0) > 0);
    }

    #[test]
    fn test_row_index_column() {
        let mut pl = Plot::default();
        pl.data_alloc(0, 1, 8);

        for n in 0..12 {
            pl.data_insert(0, &[100.0 + n as f64]);
        }

        let head = pl.dataset(0).unwrap().head_id();
        assert_eq!(head, 4);

        // Column -1 reports the stable logical id.
        assert_eq!(pl.data_cell(0, 7, -1), Some(7.0));
    }

    #[test]
    fn test_out_of_range_dataset_is_a_noop() {
        let mut pl = Plot::default();

        pl.data_alloc(99, 1, 16);
        pl.data_insert(99, &[1.0]);
        pl.data_resize(99, 32);

        assert_eq!(pl.data_space_left(99), 0);
    }
}
