//! Viewport layout and the chrome drawn around the figures: axes with
//! ticks and labels, legend, data box, slice fences, sample marks.

use crate::axis::{tick_step, AxisRole};
use crate::backend::{palette, Rasterizer, TextLayout, TextMetrics};
use crate::figure::{Drawing, MARK_MAX};
use crate::plot::{DataBoxKind, Plot, AXIS_MAX, DATA_BOX_MAX, FIGURE_MAX};

impl Plot {
    /// Refresh the pixel metrics derived from the font.
    pub fn font_layout(&mut self, font: &dyn TextMetrics) {
        let (long, _) = font.size("M");

        self.font.long = long;
        self.font.height = font.height();
        self.font.axis_box = self.opt.layout.tick_tooth + self.font.height;
        self.font.label_box = self.font.height;
        self.font.mark = self.font.height / 4;
    }

    /// Carve the viewport out of the screen rectangle: every busy
    /// axis claims a box in its margin, then the floating overlays
    /// are clamped inside.
    pub fn layout(&mut self, font: &dyn TextMetrics) {
        self.font_layout(font);

        let mut pos_x = 0;
        let mut pos_y = 0;

        for a in 0..AXIS_MAX {
            match self.axis[a].role {
                AxisRole::X => {
                    if self.axis[a].label.is_empty() {
                        self.axis[a].compact = true;
                    }

                    self.axis[a].pos = pos_x;
                    pos_x += self.font.axis_box;
                    pos_x += if self.axis[a].compact {
                        0
                    } else {
                        self.font.label_box
                    };
                }
                AxisRole::Y => {
                    if self.axis[a].label.is_empty() {
                        self.axis[a].compact = true;
                    }

                    self.axis[a].pos = pos_y;
                    pos_y += self.font.axis_box;
                    pos_y += if self.axis[a].compact {
                        0
                    } else {
                        self.font.label_box
                    };
                }
                AxisRole::Free => {}
            }
        }

        let border = self.opt.layout.border;

        self.viewport.min_x = self.screen.min_x + pos_y + border;
        self.viewport.max_x = self.screen.max_x - border;
        self.viewport.min_y = self.screen.min_y + border;
        self.viewport.max_y = self.screen.max_y - pos_x - border;

        self.legend_layout(font);

        if self.data_box.kind != DataBoxKind::Free {
            self.data_box_layout(font);
        }

        if self.mark_on {
            if self.mark_n == 0 {
                self.mark_layout();
            }
        } else {
            self.mark_n = 0;
        }
    }

    /// Palette slot an axis is annotated with: the figure color when
    /// exactly one visible figure uses it, text when several, muted
    /// when none.
    fn axis_color(&self, a: usize) -> usize {
        let mut color = palette::HIDDEN;

        for f_n in 0..FIGURE_MAX {
            if self.figure[f_n].busy && !self.figure[f_n].hidden {
                if self.figure[f_n].axis_x == a || self.figure[f_n].axis_y == a {
                    color = if color != palette::HIDDEN {
                        palette::TEXT
                    } else {
                        palette::FIGURE + f_n
                    };
                }
            }
        }

        color
    }

    fn axis_hovered(&self, a: usize) -> bool {
        let mut hover = self.hover_axis == Some(a);

        if self.shift_on {
            if let Some(f_n) = self.hover_figure {
                hover |= self.figure[f_n].axis_x == a || self.figure[f_n].axis_y == a;
            }
        }

        hover
    }

    fn draw_axis(&mut self, a: usize, rast: &mut dyn Rasterizer, font: &dyn TextMetrics) {
        let ax_col = self.axis_color(a);
        let screen = self.screen;
        let vp = self.viewport;
        let lay = self.opt.layout;

        let (scale, offset) = self.axis_transform(a);

        let fmin = -offset / scale;
        let fmax = 1.0 / scale + fmin;

        let (tis, tih, mut fexp) = tick_step(fmin, fmax, scale, offset);

        self.axis[a].tick_step = tih * scale;
        self.axis[a].tick_start = tis * scale + offset;

        let (pscale, poffset) = self.axis_pixel_transform(a);

        let box_sz = self.font.axis_box
            + if self.axis[a].compact {
                0
            } else {
                self.font.label_box
            };

        let mut ticks = Vec::new();
        let mut temp = tis;
        while temp < fmax && tih > 0.0 {
            ticks.push(temp);
            temp += tih;
        }

        match self.axis[a].role {
            AxisRole::X => {
                let lpos = vp.max_y + lay.border + self.axis[a].pos;

                if self.axis_hovered(a) {
                    rast.fill_rect(vp.min_x, lpos, vp.max_x, lpos + box_sz, palette::HIDDEN);
                }

                rast.line(&screen, vp.min_x, lpos, vp.max_x, lpos, palette::HIDDEN);

                for &t in &ticks {
                    let tpos = (t * pscale + poffset) as i32;

                    rast.line(
                        &screen,
                        tpos,
                        lpos,
                        tpos,
                        lpos + lay.tick_tooth,
                        palette::HIDDEN,
                    );

                    if self.on_x == Some(a) {
                        rast.dash_reset();
                        rast.line_dashed(
                            &screen,
                            tpos,
                            vp.min_y,
                            tpos,
                            vp.max_y,
                            palette::HIDDEN,
                            lay.grid_dash,
                            lay.grid_space,
                        );
                    }
                }

                if self.on_x == Some(a) {
                    rast.line(&screen, vp.min_x, lpos + 1, vp.max_x, lpos + 1, palette::HIDDEN);
                }

                if self.axis[a].is_slave() {
                    rast.line(
                        &screen,
                        vp.min_x,
                        lpos + lay.tick_tooth,
                        vp.max_x,
                        lpos + lay.tick_tooth,
                        palette::HIDDEN,
                    );
                }

                // Text pass.
                let mut tmove = screen.min_x;
                let mut tfar = vp.max_x;
                let mut emul = 1.0;

                if self.axis[a].exponent {
                    let mut e3 = 0;

                    while fexp >= 3 {
                        e3 += 3;
                        fexp -= 3;
                        emul /= 1000.0;
                    }

                    while fexp <= -3 {
                        e3 -= 3;
                        fexp += 3;
                        emul *= 1000.0;
                    }

                    if e3 != 0 {
                        let numbuf = format!("E{e3:+}");

                        let tpos = if self.axis[a].compact {
                            lpos + lay.tick_tooth
                        } else {
                            lpos + self.font.axis_box
                        } + self.font.height / 2;

                        let (txlen, _) = font.size(&numbuf);
                        rast.text(tfar - txlen, tpos, &numbuf, TextLayout::CENTERED_ON_Y, ax_col);

                        if self.axis[a].compact {
                            tfar -= txlen + self.font.long;
                        }
                    }
                }

                if !self.axis[a].label.is_empty() && self.axis[a].compact {
                    let (txlen, _) = font.size(&self.axis[a].label);
                    tfar -= txlen + self.font.long;
                }

                let decimals = (-fexp).max(0) as usize;

                for &t in &ticks {
                    let tpos = (t * pscale + poffset) as i32;
                    let numbuf = format!("{:.decimals$}", t * emul);

                    let (txlen, _) = font.size(&numbuf);
                    let tleft = tpos - txlen / 2 - self.font.long;
                    let tright = tpos + (txlen - txlen / 2);

                    if tmove < tleft && tright < tfar {
                        rast.text(
                            tpos,
                            lpos + lay.tick_tooth + self.font.height / 2,
                            &numbuf,
                            TextLayout::CENTERED,
                            ax_col,
                        );

                        tmove = tright;
                    }
                }

                let (tpos, lpos, tl) = if self.axis[a].compact {
                    (
                        tfar + self.font.height / 2,
                        lpos + lay.tick_tooth + self.font.height / 2,
                        TextLayout::CENTERED_ON_Y,
                    )
                } else {
                    (
                        (vp.min_x + vp.max_x) / 2,
                        lpos + self.font.axis_box + self.font.height / 2,
                        TextLayout::CENTERED,
                    )
                };

                let label = self.axis[a].label.clone();
                rast.text(tpos, lpos, &label, tl, ax_col);
            }

            AxisRole::Y => {
                let lpos = vp.min_x - lay.border - self.axis[a].pos;

                if self.axis_hovered(a) {
                    rast.fill_rect(lpos - box_sz, vp.min_y, lpos, vp.max_y, palette::HIDDEN);
                }

                rast.line(&screen, lpos, vp.min_y, lpos, vp.max_y, palette::HIDDEN);

                for &t in &ticks {
                    let tpos = (t * pscale + poffset) as i32;

                    rast.line(
                        &screen,
                        lpos,
                        tpos,
                        lpos - lay.tick_tooth,
                        tpos,
                        palette::HIDDEN,
                    );

                    if self.on_y == Some(a) {
                        rast.dash_reset();
                        rast.line_dashed(
                            &screen,
                            vp.min_x,
                            tpos,
                            vp.max_x,
                            tpos,
                            palette::HIDDEN,
                            lay.grid_dash,
                            lay.grid_space,
                        );
                    }
                }

                if self.on_y == Some(a) {
                    rast.line(&screen, lpos - 1, vp.min_y, lpos - 1, vp.max_y, palette::HIDDEN);
                }

                if self.axis[a].is_slave() {
                    rast.line(
                        &screen,
                        lpos - lay.tick_tooth,
                        vp.min_y,
                        lpos - lay.tick_tooth,
                        vp.max_y,
                        palette::HIDDEN,
                    );
                }

                let mut tmove = screen.max_y;
                let mut tfar = vp.min_y;
                let mut emul = 1.0;

                if self.axis[a].exponent {
                    let mut e3 = 0;

                    while fexp >= 3 {
                        e3 += 3;
                        fexp -= 3;
                        emul /= 1000.0;
                    }

                    while fexp <= -3 {
                        e3 -= 3;
                        fexp += 3;
                        emul *= 1000.0;
                    }

                    if e3 != 0 {
                        let numbuf = format!("E{e3:+}");

                        let tpos = if self.axis[a].compact {
                            lpos - lay.tick_tooth
                        } else {
                            lpos - self.font.axis_box
                        } - self.font.height / 2;

                        let (txlen, _) = font.size(&numbuf);
                        rast.text(
                            tpos,
                            tfar,
                            &numbuf,
                            TextLayout::CENTERED_ON_X.vertical(),
                            ax_col,
                        );

                        if self.axis[a].compact {
                            tfar += txlen + self.font.long / 2;
                        }
                    }
                }

                let tfarb = tfar;

                if !self.axis[a].label.is_empty() && self.axis[a].compact {
                    let (txlen, _) = font.size(&self.axis[a].label);
                    tfar += txlen + self.font.long / 2;
                }

                let decimals = (-fexp).max(0) as usize;

                for &t in &ticks {
                    let tpos = (t * pscale + poffset) as i32;
                    let numbuf = format!("{:.decimals$}", t * emul);

                    let (txlen, _) = font.size(&numbuf);
                    let tleft = tpos + txlen / 2 + self.font.long;
                    let tright = tpos - (txlen - txlen / 2);

                    if tmove > tleft && tright > tfar {
                        rast.text(
                            lpos - lay.tick_tooth - self.font.height / 2,
                            tpos,
                            &numbuf,
                            TextLayout::CENTERED.vertical(),
                            ax_col,
                        );

                        tmove = tright;
                    }
                }

                let (lpos, tpos, tl) = if self.axis[a].compact {
                    (
                        lpos - lay.tick_tooth - self.font.height / 2,
                        tfarb,
                        TextLayout::CENTERED_ON_X.vertical(),
                    )
                } else {
                    (
                        lpos - self.font.axis_box - self.font.height / 2,
                        (vp.min_y + vp.max_y) / 2,
                        TextLayout::CENTERED.vertical(),
                    )
                };

                let label = self.axis[a].label.clone();
                rast.text(lpos, tpos, &label, tl, ax_col);
            }

            AxisRole::Free => {}
        }
    }

    pub(crate) fn draw_axis_all(&mut self, rast: &mut dyn Rasterizer, font: &dyn TextMetrics) {
        for a in 0..AXIS_MAX {
            if self.axis[a].role != AxisRole::Free {
                self.draw_axis(a, rast, font);
            }
        }
    }

    fn legend_layout(&mut self, font: &dyn TextMetrics) {
        let mut size_n = 0;
        let mut size_max = 0;

        for f_n in 0..FIGURE_MAX {
            if self.figure[f_n].busy {
                let (size_x, _) = font.size(&self.figure[f_n].label);
                size_max = size_max.max(size_x);
                size_n += 1;
            }
        }

        self.legend_size_x = size_max + self.font.long * 2;
        self.legend_n = size_n;

        let h = self.font.height;
        let vp = self.viewport;

        self.legend_x = self
            .legend_x
            .min(vp.max_x - (size_max + h * 3))
            .max(vp.min_x + h);
        self.legend_y = self
            .legend_y
            .min(vp.max_y - h * (size_n as i32 + 1))
            .max(vp.min_y + h);
    }

    pub(crate) fn legend_draw(&mut self, rast: &mut dyn Rasterizer) {
        let vp = self.viewport;
        let lay = self.opt.layout;

        let mut leg_y = self.legend_y;
        let leg_x = self.legend_x;
        let size_x = self.font.height * 2 + self.legend_size_x;
        let size_y = self.font.height * self.legend_n as i32;

        if self.hover_legend {
            rast.fill_rect(leg_x, leg_y, leg_x + size_x, leg_y + size_y, palette::HIDDEN);
        } else if !self.opt.transparency_mode {
            rast.fill_rect(
                leg_x,
                leg_y,
                leg_x + size_x,
                leg_y + size_y,
                palette::BACKGROUND,
            );
        }

        for f_n in 0..FIGURE_MAX {
            if !self.figure[f_n].busy {
                continue;
            }

            let ncolor = if self.figure[f_n].hidden {
                palette::HIDDEN
            } else {
                palette::FIGURE + f_n
            };

            let mut fhover = self.hover_figure == Some(f_n);

            if self.shift_on {
                fhover |= self.hover_axis.is_some()
                    && (Some(self.figure[f_n].axis_x) == self.hover_axis
                        || Some(self.figure[f_n].axis_y) == self.hover_axis);
            }

            if fhover {
                let box_x = leg_x + self.font.height * 2;

                rast.fill_rect(
                    box_x,
                    leg_y,
                    box_x + self.legend_size_x,
                    leg_y + self.font.height,
                    palette::HIDDEN,
                );
            }

            let mut fwidth = self.figure[f_n].width;
            let box_y = leg_y + self.font.height / 2;

            match self.figure[f_n].drawing {
                Drawing::Line => {
                    let box_x = leg_x + self.font.height / 2;
                    let y = if fwidth > 1 {
                        box_y as f64
                    } else {
                        box_y as f64 + 0.5
                    };

                    rast.canvas_line(
                        &vp,
                        box_x as f64,
                        y,
                        (box_x + self.font.height) as f64,
                        y,
                        ncolor,
                        fwidth,
                    );
                }
                Drawing::Dash => {
                    let box_x = leg_x + self.font.height / 2;
                    let y = if fwidth > 1 {
                        box_y as f64
                    } else {
                        box_y as f64 + 0.5
                    };

                    rast.dash_reset();
                    rast.canvas_dash(
                        &vp,
                        box_x as f64,
                        y,
                        (box_x + self.font.height) as f64,
                        y,
                        ncolor,
                        fwidth,
                        lay.drawing_dash,
                        lay.drawing_space,
                    );
                }
                Drawing::Dot => {
                    let box_x = leg_x + self.font.height;
                    let size = if fwidth > 2 { fwidth } else { 2 };

                    rast.canvas_dot(
                        &vp,
                        box_x as f64 + 0.5,
                        box_y as f64 + 0.5,
                        size,
                        ncolor,
                    );
                }
            }

            if self.mark_on {
                let box_x = leg_x + self.font.height;
                fwidth = fwidth.max(1);

                rast.canvas_mark(
                    &vp,
                    box_x as f64,
                    box_y as f64,
                    self.font.mark,
                    f_n,
                    ncolor,
                    fwidth,
                );
            }

            let text_col = if self.figure[f_n].hidden {
                palette::HIDDEN
            } else {
                palette::TEXT
            };

            let label = self.figure[f_n].label.clone();
            rast.text(
                leg_x + self.font.height * 2 + self.font.long,
                box_y,
                &label,
                TextLayout::CENTERED_ON_Y,
                text_col,
            );

            leg_y += self.font.height;
        }
    }

    /// Figure row under a click inside the legend; remembered as the
    /// hovered figure.
    pub fn legend_get_by_click(&mut self, cur_x: i32, cur_y: i32) -> Option<usize> {
        let mut leg_y = self.legend_y;
        let leg_x = self.legend_x;

        let mut hit = None;

        for f_n in 0..FIGURE_MAX {
            if !self.figure[f_n].busy {
                continue;
            }

            let rel_x = cur_x - (leg_x + self.font.height * 2);
            let rel_y = cur_y - leg_y;

            if rel_x > 0 && rel_x < self.legend_size_x && rel_y > 0 && rel_y < self.font.height {
                hit = Some(f_n);
                break;
            }

            leg_y += self.font.height;
        }

        self.hover_figure = hit;
        hit
    }

    /// Did the click land on the legend's swatch column?
    pub fn legend_box_get_by_click(&mut self, cur_x: i32, cur_y: i32) -> bool {
        let rel_x = cur_x - self.legend_x;
        let rel_y = cur_y - self.legend_y;

        let hit = rel_x > 0
            && rel_x < self.font.height * 2
            && rel_y > 0
            && rel_y < self.font.height * self.legend_n as i32;

        self.hover_legend = hit;
        hit
    }

    fn data_box_layout(&mut self, font: &dyn TextMetrics) {
        let mut size_n = 0;
        let mut size_max = 0;

        match self.data_box.kind {
            DataBoxKind::Slice => {
                for f_n in 0..FIGURE_MAX {
                    if self.figure[f_n].busy {
                        let (size_x, _) = font.size(&self.data_box.text[f_n]);
                        size_max = size_max.max(size_x);
                        size_n += 1;
                    }
                }
            }
            DataBoxKind::Polyfit => {
                for n in 0..DATA_BOX_MAX {
                    if !self.data_box.text[n].is_empty() {
                        let (size_x, _) = font.size(&self.data_box.text[n]);
                        size_max = size_max.max(size_x);
                        size_n += 1;
                    }
                }
            }
            DataBoxKind::Free => {}
        }

        self.data_box.size_x = size_max;
        self.data_box.size_n = size_n;

        let h = self.font.height;
        let vp = self.viewport;

        self.data_box.x = self
            .data_box
            .x
            .min(vp.max_x - (size_max + h))
            .max(vp.min_x + h);
        self.data_box.y = self
            .data_box
            .y
            .min(vp.max_y - h * (size_n as i32 + 1))
            .max(vp.min_y + h);
    }

    pub(crate) fn data_box_draw(&mut self, rast: &mut dyn Rasterizer) {
        let leg_x = self.data_box.x;
        let mut leg_y = self.data_box.y;
        let size_x = self.data_box.size_x;
        let size_y = self.font.height * self.data_box.size_n as i32;

        if self.hover_data_box {
            rast.fill_rect(leg_x, leg_y, leg_x + size_x, leg_y + size_y, palette::HIDDEN);
        } else if !self.opt.transparency_mode {
            rast.fill_rect(
                leg_x,
                leg_y,
                leg_x + size_x,
                leg_y + size_y,
                palette::BACKGROUND,
            );
        }

        match self.data_box.kind {
            DataBoxKind::Slice => {
                for f_n in 0..FIGURE_MAX {
                    if !self.figure[f_n].busy {
                        continue;
                    }

                    if !self.data_box.text[f_n].is_empty() {
                        let box_y = leg_y + self.font.height / 2;
                        let text = self.data_box.text[f_n].clone();

                        rast.text(
                            leg_x,
                            box_y,
                            &text,
                            TextLayout::CENTERED_ON_Y,
                            palette::FIGURE + f_n,
                        );
                    }

                    leg_y += self.font.height;
                }
            }
            DataBoxKind::Polyfit => {
                for n in 0..DATA_BOX_MAX {
                    if !self.data_box.text[n].is_empty() {
                        let box_y = leg_y + self.font.height / 2;
                        let text = self.data_box.text[n].clone();

                        rast.text(leg_x, box_y, &text, TextLayout::CENTERED_ON_Y, palette::TEXT);

                        leg_y += self.font.height;
                    }
                }
            }
            DataBoxKind::Free => {}
        }
    }

    /// Did the click land inside the data box?
    pub fn data_box_get_by_click(&mut self, cur_x: i32, cur_y: i32) -> bool {
        let rel_x = cur_x - self.data_box.x;
        let rel_y = cur_y - self.data_box.y;

        let hit = rel_x > 0
            && rel_x < self.data_box.size_x
            && rel_y > 0
            && rel_y < self.font.height * self.data_box.size_n as i32;

        self.hover_data_box = hit;
        hit
    }

    /// Translucent band between the armed base point and the current
    /// slice position.
    pub(crate) fn slice_light_draw(&mut self, rast: &mut dyn Rasterizer) {
        let Some(slice_axis) = self.slice_axis else {
            return;
        };

        let vp = self.viewport;

        for f_n in 0..FIGURE_MAX {
            if !self.figure[f_n].slice_busy {
                continue;
            }

            let a_n = self.figure[f_n].axis_x;
            let b_n = self.figure[f_n].axis_y;

            let mut base_x = self.axis_conv(a_n, self.figure[f_n].slice_base_x);
            let mut base_y = self.axis_conv(b_n, self.figure[f_n].slice_base_y);

            let mut data_x = self.axis_conv(a_n, self.figure[f_n].slice_x);
            let mut data_y = self.axis_conv(b_n, self.figure[f_n].slice_y);

            if data_x < base_x {
                std::mem::swap(&mut base_x, &mut data_x);
            }

            if data_y < base_y {
                std::mem::swap(&mut base_y, &mut data_y);
            }

            match self.axis[slice_axis].role {
                AxisRole::X => {
                    if base_x.is_finite() && data_x.is_finite() {
                        rast.clip_rect(
                            &vp,
                            base_x,
                            vp.min_y as f64,
                            data_x,
                            vp.max_y as f64,
                            palette::HIDDEN,
                        );
                    }
                }
                AxisRole::Y => {
                    if base_y.is_finite() && data_y.is_finite() {
                        rast.clip_rect(
                            &vp,
                            vp.min_x as f64,
                            base_y,
                            vp.max_x as f64,
                            data_y,
                            palette::HIDDEN,
                        );
                    }
                }
                AxisRole::Free => {}
            }
        }
    }

    /// Dashed fence lines and endpoint dots at the slice position.
    pub(crate) fn slice_draw(&mut self, rast: &mut dyn Rasterizer) {
        let Some(slice_axis) = self.slice_axis else {
            return;
        };

        let vp = self.viewport;
        let lay = self.opt.layout;

        for f_n in 0..FIGURE_MAX {
            if !self.figure[f_n].slice_busy {
                continue;
            }

            let a_n = self.figure[f_n].axis_x;
            let b_n = self.figure[f_n].axis_y;

            let base_x = self.axis_conv(a_n, self.figure[f_n].slice_base_x);
            let base_y = self.axis_conv(b_n, self.figure[f_n].slice_base_y);

            let data_x = self.axis_conv(a_n, self.figure[f_n].slice_x);
            let data_y = self.axis_conv(b_n, self.figure[f_n].slice_y);

            rast.dash_reset();

            match self.axis[slice_axis].role {
                AxisRole::X => {
                    if self.slice_range_on != 0 && base_x.is_finite() {
                        rast.canvas_dash(
                            &vp,
                            base_x,
                            vp.min_y as f64,
                            base_x,
                            vp.max_y as f64,
                            palette::TEXT,
                            1,
                            lay.fence_dash,
                            lay.fence_space,
                        );
                    }

                    if data_x.is_finite() {
                        rast.canvas_dash(
                            &vp,
                            data_x,
                            vp.min_y as f64,
                            data_x,
                            vp.max_y as f64,
                            palette::TEXT,
                            1,
                            lay.fence_dash,
                            lay.fence_space,
                        );
                    }
                }
                AxisRole::Y => {
                    if self.slice_range_on != 0 && base_y.is_finite() {
                        rast.canvas_dash(
                            &vp,
                            vp.min_x as f64,
                            base_y,
                            vp.max_x as f64,
                            base_y,
                            palette::TEXT,
                            1,
                            lay.fence_dash,
                            lay.fence_space,
                        );
                    }

                    if data_y.is_finite() {
                        rast.canvas_dash(
                            &vp,
                            vp.min_x as f64,
                            data_y,
                            vp.max_x as f64,
                            data_y,
                            palette::TEXT,
                            1,
                            lay.fence_dash,
                            lay.fence_space,
                        );
                    }
                }
                AxisRole::Free => {}
            }

            if self.slice_range_on != 0 && base_x.is_finite() && base_y.is_finite() {
                rast.canvas_dot(&vp, base_x, base_y, lay.fence_point, palette::TEXT);
            }

            if data_x.is_finite() && data_y.is_finite() {
                rast.canvas_dot(&vp, data_x, data_y, lay.fence_point, palette::TEXT);
            }
        }
    }

    /// Place `mark_n` sample markers per figure, evenly spaced in
    /// normalized X and snapped to the nearest sample.
    pub(crate) fn mark_layout(&mut self) {
        let fig_n = (0..FIGURE_MAX)
            .filter(|&n| self.figure[n].busy && !self.figure[n].hidden)
            .count();

        if fig_n == 0 {
            return;
        }

        let bh = self.font.mark as f64 * (fig_n as f64).sqrt() * 4.0;

        self.mark_n = ((self.viewport.max_x - self.viewport.min_x) as f64 / bh) as usize;
        self.mark_n = self.mark_n.clamp(1, MARK_MAX);

        let bh = 1.0 / (self.mark_n * fig_n) as f64;

        let mut f_1 = 0;

        for f_n in 0..FIGURE_MAX {
            if !self.figure[f_n].busy || self.figure[f_n].hidden {
                continue;
            }

            let (scale, offset) = self.axis_transform(self.figure[f_n].axis_x);

            let d = self.figure[f_n].data_n;
            let c_z = self.figure[f_n].column_x;

            for n in 0..self.mark_n {
                let fval = ((n * fig_n + f_1) as f64) * bh;
                let fval = (fval - offset) / scale;

                let found = self.data_slice_get(d, c_z, fval);

                let (mark_x, mark_y) = match found {
                    Some(id) => {
                        let c_x = self.figure[f_n].column_x;
                        let c_y = self.figure[f_n].column_y;

                        let x = self.data_cell(d, id, c_x).unwrap_or(0.0);
                        let y = self.data_cell(d, id, c_y).unwrap_or(0.0);
                        (x, y)
                    }
                    None => (0.0, 0.0),
                };

                self.figure[f_n].mark_x[n] = mark_x;
                self.figure[f_n].mark_y[n] = mark_y;
            }

            f_1 += 1;
        }
    }

    pub(crate) fn mark_draw(&mut self, rast: &mut dyn Rasterizer) {
        let vp = self.viewport;

        for f_n in 0..FIGURE_MAX {
            if !self.figure[f_n].busy || self.figure[f_n].hidden {
                continue;
            }

            let ncolor = palette::FIGURE + f_n;
            let fwidth = self.figure[f_n].width.max(1);

            let (scale_x, offset_x) = self.axis_pixel_transform(self.figure[f_n].axis_x);
            let (scale_y, offset_y) = self.axis_pixel_transform(self.figure[f_n].axis_y);

            for n in 0..self.mark_n {
                let x = self.figure[f_n].mark_x[n] * scale_x + offset_x;
                let y = self.figure[f_n].mark_y[n] * scale_y + offset_y;

                if x.is_finite() && y.is_finite() {
                    rast.canvas_mark(&vp, x, y, self.font.mark, f_n, ncolor, fwidth);
                }
            }
        }
    }
}
