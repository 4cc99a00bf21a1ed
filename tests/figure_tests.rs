mod common;

#[cfg(test)]
mod tests {
    use scopechart::{AxisRole, DataBoxKind, Drawing, Plot};

    use crate::common::{plot_on_screen, FixedFont, NaiveLse};

    fn ramp_plot() -> Plot {
        let mut pl = plot_on_screen();
        pl.data_alloc(0, 2, 128);

        for n in 0..100 {
            pl.data_insert(0, &[n as f64, 2.0 * n as f64 + 1.0]);
        }

        pl.figure_add(0, 0, 0, 1, 0, 1, "");
        pl.layout(&FixedFont);
        pl
    }

    #[test]
    fn test_figure_add_claims_free_axes() {
        let pl = ramp_plot();

        assert_eq!(pl.axis_ref(0).unwrap().role(), AxisRole::X);
        assert_eq!(pl.axis_ref(1).unwrap().role(), AxisRole::Y);
        assert_eq!(pl.focused_axes(), (Some(0), Some(1)));
    }

    #[test]
    fn test_figure_add_rejects_bad_bindings() {
        let mut pl = plot_on_screen();
        pl.data_alloc(0, 2, 16);
        pl.data_insert(0, &[0.0, 0.0]);

        // Same axis on both sides.
        pl.figure_add(0, 0, 0, 1, 3, 3, "");
        assert!(!pl.figure_ref(0).unwrap().is_busy());

        // Column out of range.
        pl.figure_add(0, 0, 0, 99, 0, 1, "");
        assert!(!pl.figure_ref(0).unwrap().is_busy());

        // Unallocated dataset.
        pl.figure_add(0, 5, 0, 1, 0, 1, "");
        assert!(!pl.figure_ref(0).unwrap().is_busy());

        // Orientation mismatch: axis 1 becomes Y, then is asked for X.
        pl.figure_add(0, 0, 0, 1, 0, 1, "");
        pl.figure_add(1, 0, 0, 1, 1, 2, "");
        assert!(!pl.figure_ref(1).unwrap().is_busy());
    }

    #[test]
    fn test_figure_remove_retires_private_axes() {
        let mut pl = ramp_plot();
        pl.figure_add(1, 0, 0, 1, 0, 2, "");

        pl.figure_remove(1);

        assert!(!pl.figure_ref(1).unwrap().is_busy());
        assert_eq!(pl.axis_ref(2).unwrap().role(), AxisRole::Free);

        // The shared X axis survives.
        assert_eq!(pl.axis_ref(0).unwrap().role(), AxisRole::X);
    }

    #[test]
    fn test_figure_exchange_swaps_paint_order() {
        let mut pl = ramp_plot();
        pl.figure_add(1, 0, 0, 1, 0, 2, "second");

        pl.figure_exchange(0, 1);

        assert_eq!(pl.figure_ref(0).unwrap().label(), "second");
        assert_eq!(pl.figure_ref(1).unwrap().label(), "");
    }

    #[test]
    fn test_move_axes_rebinds_to_focus() {
        let mut pl = ramp_plot();
        pl.figure_add(1, 0, 0, 1, 0, 2, "");

        // Figure 1 sits on axis 2; the focus is on axis 1.
        pl.figure_move_axes(1);

        let (_, _, _, _, a_y) = pl.figure_ref(1).unwrap().binding();
        assert_eq!(a_y, 1);
        assert_eq!(pl.axis_ref(2).unwrap().role(), AxisRole::Free);
    }

    #[test]
    fn test_make_individual_axes_splits_shared_ones() {
        let mut pl = ramp_plot();
        pl.figure_add(1, 0, 0, 1, 0, 1, "");

        pl.figure_make_individual_axes(1);

        let (_, _, _, a_x, a_y) = pl.figure_ref(1).unwrap().binding();

        assert_ne!(a_x, 0);
        assert_ne!(a_y, 1);
        assert_eq!(pl.axis_ref(a_x).unwrap().role(), AxisRole::X);
        assert_eq!(pl.axis_ref(a_y).unwrap().role(), AxisRole::Y);
    }

    #[test]
    fn test_polyfit_figure_and_data_box() {
        let mut pl = ramp_plot();

        pl.axis_scale_auto(0);
        pl.axis_scale_auto(1);

        let mut lse = NaiveLse::default();
        pl.figure_subtract_polyfit(0, 1, &mut lse);

        let fit = pl.figure_ref(1).expect("fit figure");
        assert!(fit.is_busy());
        assert!(fit.label().starts_with("P:"));
        let (_, _, c, _, _) = fit.binding();

        // y = 2x + 1 is reproduced exactly.
        for id in [0i64, 13, 57, 99] {
            let want = 2.0 * id as f64 + 1.0;
            let got = pl.data_cell(0, id, c).unwrap();
            assert!((want - got).abs() < 1e-6, "row {id}: {got} vs {want}");
        }

        assert_eq!(pl.data_box_kind(), DataBoxKind::Polyfit);
        assert!(pl.data_box_text(0).contains("[0]"));
        assert!(pl.data_box_text(1).contains("[1]"));
        assert!(pl.data_box_text(2).contains("STD"));
    }

    #[test]
    fn test_time_unwrap_figure_op_replaces_x_column() {
        let mut pl = plot_on_screen();
        pl.data_alloc(0, 2, 64);

        for v in [0.0, 1.0, 2.0, 0.0, 1.0] {
            pl.data_insert(0, &[v, 10.0]);
        }

        pl.figure_add(0, 0, 0, 1, 0, 1, "");
        pl.figure_subtract_time_unwrap(0);

        let (_, c_x, _, _, _) = pl.figure_ref(0).unwrap().binding();
        assert!(c_x >= 2, "X column must point into the derived region");

        assert_eq!(pl.data_cell(0, 4, c_x), Some(4.0));
    }

    #[test]
    fn test_figure_clean_resets_everything() {
        let mut pl = ramp_plot();
        pl.slice_enable(true);
        pl.figure_clean();

        assert!(!pl.figure_ref(0).unwrap().is_busy());
        assert_eq!(pl.axis_ref(0).unwrap().role(), AxisRole::Free);
        assert_eq!(pl.focused_axes(), (None, None));
        assert_eq!(pl.data_box_kind(), DataBoxKind::Free);
        assert!(!pl.draw_pending());

        // Data survives a figure clean.
        assert_eq!(pl.dataset(0).unwrap().rows(), 100);
    }

    #[test]
    fn test_style_setters() {
        let mut pl = ramp_plot();

        pl.figure_set_drawing(0, Drawing::Dot);
        pl.figure_set_width(0, 4);
        pl.figure_set_hidden(0, true);

        assert!(pl.figure_ref(0).unwrap().is_hidden());
    }

    #[test]
    fn test_slice_track_fills_data_box() {
        let mut pl = ramp_plot();

        pl.axis_scale_auto(0);
        pl.axis_scale_auto(1);
        pl.slice_enable(true);

        let vp = pl.viewport();
        let px = (vp.min_x + vp.max_x) / 2;

        pl.slice_track(px, (vp.min_y + vp.max_y) / 2);

        assert_eq!(pl.data_box_kind(), DataBoxKind::Slice);

        let fig = pl.figure_ref(0).unwrap();
        let (slice_x, slice_y) = fig.slice_point().expect("a sample was hit");

        assert!((slice_y - (2.0 * slice_x + 1.0)).abs() < 1e-9);
        assert!((0.0..100.0).contains(&slice_x));
        assert!(!pl.data_box_text(0).is_empty());
    }

    #[test]
    fn test_legend_hit_testing() {
        let mut pl = plot_on_screen();
        pl.data_alloc(0, 2, 16);
        pl.data_insert(0, &[0.0, 1.0]);

        pl.figure_add(0, 0, 0, 1, 0, 1, "");
        pl.layout(&FixedFont);

        let vp = pl.viewport();

        // The legend clamps to the top-left corner by default; the
        // label row starts two line-heights right of the box.
        let hit = pl.legend_get_by_click(vp.min_x + 14 + 2 * 14 + 2, vp.min_y + 14 + 2);
        assert_eq!(hit, Some(0));

        let miss = pl.legend_get_by_click(vp.max_x - 1, vp.max_y - 1);
        assert_eq!(miss, None);

        assert!(pl.legend_box_get_by_click(vp.min_x + 14 + 2, vp.min_y + 14 + 2));
    }
}
