use chrono::{Datelike, NaiveDateTime};
use egui::{Color32, Pos2, Rect, Rounding, Sense, Shape, Stroke, Ui, Vec2};
use futures::executor::block_on;

use gantt_timeline::engine::{arrow_path, BarGeometry, GestureState};
use gantt_timeline::{Granularity, Interaction, TaskKind, TimelineModel};

use crate::app::AppHost;
use crate::ui::theme;

const HEADER_HEIGHT: f32 = theme::HEADER_HEIGHT;
const EXPANDER_SIZE: f32 = 10.0;

/// Render the chart and route pointer input into `interaction`.
pub fn show_gantt_chart(
    model: &TimelineModel,
    interaction: &mut Interaction,
    host: &mut AppHost,
    ui: &mut Ui,
) {
    let available = ui.available_size();
    let chart_width = (model.width() as f32).max(available.x);
    let chart_height = HEADER_HEIGHT + model.height() as f32 + 40.0;

    egui::ScrollArea::both()
        .auto_shrink([false, false])
        .show_viewport(ui, |ui, viewport| {
            let (response, painter) = ui.allocate_painter(
                Vec2::new(chart_width, chart_height.max(available.y)),
                Sense::click_and_drag(),
            );
            let origin = response.rect.min;
            let body = origin + Vec2::new(0.0, HEADER_HEIGHT);

            painter.rect_filled(response.rect, 0.0, theme::BG_DARK);

            let scroll_top = f64::from((viewport.min.y - HEADER_HEIGHT).max(0.0));
            let window = model.window(scroll_top, f64::from(viewport.height()));
            let rows = match &window {
                Some(w) => w.rows(),
                None => 0..=model.rows().len().saturating_sub(1),
            };
            let row_height = model.options().sizing.row_height as f32;

            // Optimistic geometry for the bar under a drag.
            let live = interaction.gesture().map(|g| &g.current);
            let bar_at = |i: usize| -> Option<&BarGeometry> {
                match live {
                    Some(current) if current.index == i => Some(current),
                    _ => model.bars().get(i),
                }
            };

            for i in rows.clone() {
                if model.rows().is_empty() {
                    break;
                }
                let y = body.y + i as f32 * row_height;
                let fill = if i % 2 == 0 { theme::BG_PANEL } else { theme::BG_DARK };
                painter.rect_filled(
                    Rect::from_min_size(Pos2::new(origin.x, y), Vec2::new(chart_width, row_height)),
                    0.0,
                    fill,
                );
            }

            draw_grid(&painter, origin, model, chart_height);
            draw_today_line(&painter, origin, model, chart_height);

            for (from, to) in model.visible_edges(window.as_ref()) {
                if let (Some(a), Some(b)) = (bar_at(from), bar_at(to)) {
                    let path = arrow_path(a, b, &model.options().sizing, model.axis().is_rtl());
                    let points: Vec<Pos2> = path.points.iter().map(|&p| at(body, p)).collect();
                    painter.add(Shape::line(points, Stroke::new(1.5, theme::ARROW)));
                    painter.add(Shape::convex_polygon(
                        path.head.iter().map(|&p| at(body, p)).collect(),
                        theme::ARROW,
                        Stroke::NONE,
                    ));
                }
            }

            for i in rows {
                let (Some(bar), Some(task)) = (bar_at(i), model.rows().get(i)) else {
                    continue;
                };
                let selected = interaction.selected() == Some(task.id.as_str());
                let hovered = interaction.hovered() == Some(task.id.as_str());
                match bar.kind {
                    TaskKind::Milestone => draw_milestone(&painter, body, bar, task.color, selected),
                    TaskKind::Task | TaskKind::Project => {
                        draw_bar(&painter, body, bar, &task.name, task.color, selected, hovered, model)
                    }
                }
                if bar.kind == TaskKind::Project {
                    draw_expander(&painter, expander_rect(body, bar, model), task.hide_children);
                }
            }

            draw_header(&painter, origin, model, chart_width);

            route_pointer(&response, body, model, interaction, host);
        });
}

fn at(body: Pos2, (x, y): (f64, f64)) -> Pos2 {
    Pos2::new(body.x + x as f32, body.y + y as f32)
}

fn expander_rect(body: Pos2, bar: &BarGeometry, model: &TimelineModel) -> Rect {
    let x = if model.axis().is_rtl() {
        bar.x2 as f32 + 4.0
    } else {
        bar.x1 as f32 - EXPANDER_SIZE - 4.0
    };
    let y = (bar.y + bar.height / 2.0) as f32 - EXPANDER_SIZE / 2.0;
    Rect::from_min_size(body + Vec2::new(x, y), Vec2::splat(EXPANDER_SIZE))
}

fn route_pointer(
    response: &egui::Response,
    body: Pos2,
    model: &TimelineModel,
    interaction: &mut Interaction,
    host: &mut AppHost,
) {
    let local = |p: Pos2| (f64::from(p.x - body.x), f64::from(p.y - body.y));

    if let Some(p) = response.hover_pos() {
        let (x, y) = local(p);
        match model.hit(x, y) {
            Some((bar, handle)) => {
                interaction.pointer_enter(&bar.task_id);
                response.ctx.set_cursor_icon(cursor_for(handle));
            }
            None => {
                if let Some(id) = interaction.hovered().map(str::to_string) {
                    interaction.pointer_leave(&id);
                }
            }
        }
    }

    if response.drag_started() {
        if let Some(p) = response.interact_pointer_pos() {
            let (x, y) = local(p);
            if let Some((bar, handle)) = model.hit(x, y) {
                let id = bar.task_id.clone();
                interaction.pointer_down(model, &id, Some(handle), x, host);
            }
        }
    }
    if response.dragged() {
        if let Some(p) = response.interact_pointer_pos() {
            interaction.pointer_move(model, local(p).0, host);
        }
    }
    if response.drag_stopped() {
        let x = response
            .interact_pointer_pos()
            .map(|p| local(p).0)
            .or_else(|| interaction.gesture().map(|g| g.origin_x));
        match x {
            Some(x) => {
                block_on(interaction.release(model, x, host));
            }
            None if matches!(interaction.state(), GestureState::Armed { .. }) => {
                interaction.pointer_up(model, 0.0);
            }
            None => {}
        }
    }

    if response.clicked() || response.double_clicked() {
        let Some(p) = response.interact_pointer_pos() else {
            return;
        };
        let (x, y) = local(p);
        let expander = model
            .bars()
            .iter()
            .filter(|b| b.kind == TaskKind::Project)
            .find(|b| expander_rect(body, b, model).contains(p));
        if let Some(bar) = expander {
            let id = bar.task_id.clone();
            interaction.toggle_expander(model, &id, host);
            return;
        }
        match model.hit(x, y) {
            Some((bar, _)) => {
                let id = bar.task_id.clone();
                interaction.pointer_down(model, &id, None, x, host);
                if response.double_clicked() {
                    interaction.double_click(&id, host);
                } else {
                    interaction.click(&id, host);
                }
            }
            None => interaction.select(None, host),
        }
    }
}

fn cursor_for(handle: gantt_timeline::DragHandle) -> egui::CursorIcon {
    use gantt_timeline::DragHandle::*;
    match handle {
        Move => egui::CursorIcon::Grab,
        Progress => egui::CursorIcon::ResizeColumn,
        PlannedStart | PlannedEnd | ActualStart | ActualEnd => egui::CursorIcon::ResizeHorizontal,
    }
}

fn tick_label(granularity: Granularity, t: NaiveDateTime) -> String {
    match granularity {
        Granularity::Shift => t.format("%H:%M").to_string(),
        Granularity::Day => t.format("%d").to_string(),
        Granularity::Week => t.format("W%V").to_string(),
        Granularity::Month => t.format("%b %Y").to_string(),
        Granularity::Quarter => format!("Q{} {}", (t.month() - 1) / 3 + 1, t.year()),
        Granularity::Year => t.format("%Y").to_string(),
    }
}

/// Upper header line, shown where a new month (or day, for shifts) begins.
fn group_label(granularity: Granularity, prev: Option<NaiveDateTime>, t: NaiveDateTime) -> Option<String> {
    let starts_group = match (granularity, prev) {
        (_, None) => true,
        (Granularity::Shift, Some(p)) => p.date() != t.date(),
        (Granularity::Day | Granularity::Week, Some(p)) => p.month() != t.month(),
        _ => false,
    };
    if !starts_group {
        return None;
    }
    match granularity {
        Granularity::Shift => Some(t.format("%a %d %b").to_string()),
        Granularity::Day | Granularity::Week => Some(t.format("%b %Y").to_string()),
        _ => None,
    }
}

fn draw_grid(painter: &egui::Painter, origin: Pos2, model: &TimelineModel, height: f32) {
    let axis = model.axis();
    for tick in axis.ticks() {
        let x = origin.x + axis.time_to_x(*tick) as f32;
        painter.line_segment(
            [Pos2::new(x, origin.y + HEADER_HEIGHT), Pos2::new(x, origin.y + height)],
            Stroke::new(0.5, theme::GRID_LINE),
        );
    }
}

fn draw_header(painter: &egui::Painter, origin: Pos2, model: &TimelineModel, width: f32) {
    painter.rect_filled(
        Rect::from_min_size(origin, Vec2::new(width, HEADER_HEIGHT)),
        0.0,
        theme::BG_HEADER,
    );
    painter.line_segment(
        [
            Pos2::new(origin.x, origin.y + HEADER_HEIGHT),
            Pos2::new(origin.x + width, origin.y + HEADER_HEIGHT),
        ],
        Stroke::new(1.0, theme::BORDER_SUBTLE),
    );

    let axis = model.axis();
    let granularity = axis.granularity();
    let rtl = axis.is_rtl();
    let column = axis.column_width() as f32;
    let mut prev = None;
    for tick in axis.ticks().iter().take(axis.column_count()) {
        let edge = origin.x + axis.time_to_x(*tick) as f32;
        // Label inside the column, whichever side it extends to.
        let left = if rtl { edge - column } else { edge };
        painter.text(
            Pos2::new(left + 3.0, origin.y + 30.0),
            egui::Align2::LEFT_CENTER,
            tick_label(granularity, *tick),
            theme::font_sub(),
            theme::TEXT_SECONDARY,
        );
        if let Some(group) = group_label(granularity, prev, *tick) {
            painter.text(
                Pos2::new(left + 3.0, origin.y + 12.0),
                egui::Align2::LEFT_CENTER,
                group,
                theme::font_header(),
                theme::TEXT_PRIMARY,
            );
        }
        prev = Some(*tick);
    }
}

fn draw_today_line(painter: &egui::Painter, origin: Pos2, model: &TimelineModel, height: f32) {
    let x = origin.x + model.today_x() as f32;
    painter.line_segment(
        [Pos2::new(x, origin.y + HEADER_HEIGHT), Pos2::new(x, origin.y + height)],
        Stroke::new(1.5, theme::TODAY_LINE),
    );
}

#[allow(clippy::too_many_arguments)]
fn draw_bar(
    painter: &egui::Painter,
    body: Pos2,
    bar: &BarGeometry,
    name: &str,
    color: Color32,
    selected: bool,
    hovered: bool,
    model: &TimelineModel,
) {
    let sizing = &model.options().sizing;
    let rounding = Rounding::same(sizing.corner_radius as f32);
    let rect = Rect::from_min_max(
        at(body, (bar.x1, bar.y)),
        at(body, (bar.x2.max(bar.x1 + 2.0), bar.y + bar.height)),
    );

    painter.rect_filled(rect.translate(Vec2::new(1.0, 2.0)), rounding, Color32::from_black_alpha(35));
    let fill = if bar.kind == TaskKind::Project {
        color.gamma_multiply(0.8)
    } else {
        color
    };
    painter.rect_filled(rect, rounding, fill);

    if bar.progress_width > 0.0 {
        let progress = Rect::from_min_size(
            at(body, (bar.progress_x, bar.y)),
            Vec2::new(bar.progress_width as f32, rect.height()),
        );
        painter.rect_filled(progress, rounding, theme::PROGRESS_OVERLAY);
    }

    // Actual interval as a strip along the bottom quarter.
    let strip = Rect::from_min_max(
        at(body, (bar.actual_x1, bar.y + bar.height * 0.75)),
        at(body, (bar.actual_x2.max(bar.actual_x1 + 2.0), bar.y + bar.height)),
    );
    painter.rect_filled(strip, Rounding::same(1.0), theme::ACTUAL_STRIP);

    if selected {
        painter.rect_stroke(
            rect.expand(1.5),
            Rounding::same(sizing.corner_radius as f32 + 1.5),
            Stroke::new(2.0, theme::BORDER_ACCENT),
        );
    }

    if selected || hovered {
        let knob = at(body, (bar.progress_edge(model.axis().is_rtl()), bar.y + bar.height));
        painter.circle_filled(knob, 3.5, theme::HANDLE_COLOR);
        let handle_h = rect.height() * 0.55;
        for edge_x in [rect.left(), rect.right()] {
            let handle = Rect::from_center_size(
                Pos2::new(edge_x, rect.center().y),
                Vec2::new(4.0, handle_h),
            );
            painter.rect_filled(handle, Rounding::same(2.0), theme::HANDLE_COLOR);
        }
    }

    if rect.width() > 30.0 {
        let galley = painter.layout_no_wrap(name.to_string(), theme::font_bar(), theme::TEXT_ON_BAR);
        let text_y = rect.top() + (rect.height() * 0.75 - galley.size().y) / 2.0;
        painter
            .with_clip_rect(rect)
            .galley(Pos2::new(rect.left() + 6.0, text_y), galley, Color32::TRANSPARENT);
    }
}

fn draw_milestone(painter: &egui::Painter, body: Pos2, bar: &BarGeometry, color: Color32, selected: bool) {
    let center = at(body, ((bar.x1 + bar.x2) / 2.0, bar.y + bar.height / 2.0));
    let size = (bar.height / 2.0) as f32;
    let points = vec![
        center + Vec2::new(0.0, -size),
        center + Vec2::new(size, 0.0),
        center + Vec2::new(0.0, size),
        center + Vec2::new(-size, 0.0),
    ];
    let stroke = if selected {
        Stroke::new(2.0, theme::BORDER_ACCENT)
    } else {
        Stroke::NONE
    };
    painter.add(Shape::convex_polygon(points, color, stroke));
}

fn draw_expander(painter: &egui::Painter, rect: Rect, collapsed: bool) {
    let c = rect.center();
    let h = rect.width() / 2.0;
    let points = if collapsed {
        vec![c + Vec2::new(-h / 2.0, -h), c + Vec2::new(h / 2.0, 0.0), c + Vec2::new(-h / 2.0, h)]
    } else {
        vec![c + Vec2::new(-h, -h / 2.0), c + Vec2::new(h, -h / 2.0), c + Vec2::new(0.0, h / 2.0)]
    };
    painter.add(Shape::convex_polygon(points, theme::TEXT_SECONDARY, Stroke::NONE));
}
