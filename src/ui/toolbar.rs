use egui::{menu, RichText, Ui};
use gantt_timeline::Granularity;

use crate::app::GanttApp;

const SNAP_CHOICES: [(Option<u32>, &str); 4] = [
    (None, "Off"),
    (Some(15), "15 min"),
    (Some(60), "1 hour"),
    (Some(24 * 60), "1 day"),
];

/// Render the top menu bar.
pub fn show_toolbar(app: &mut GanttApp, ui: &mut Ui) {
    menu::bar(ui, |ui| {
        ui.menu_button("  File  ", |ui| {
            if ui.button("  Save          Ctrl+S").clicked() {
                app.save_project();
                ui.close_menu();
            }
            if ui.button("  Reload").clicked() {
                app.reload_project();
                ui.close_menu();
            }
        });

        ui.menu_button("  Edit  ", |ui| {
            let has_selection = app.interaction.selected().is_some();
            if ui
                .add_enabled(has_selection, egui::Button::new("  Delete task      Del"))
                .clicked()
            {
                app.delete_selected();
                ui.close_menu();
            }
        });

        ui.menu_button("  View  ", |ui| {
            ui.label(RichText::new("Time scale").small().weak());
            for granularity in Granularity::ALL {
                if ui
                    .radio(app.options.granularity == granularity, granularity.label())
                    .clicked()
                {
                    app.set_options(|o| o.granularity = granularity);
                    ui.close_menu();
                }
            }
            ui.separator();
            ui.label(RichText::new("Snap while dragging").small().weak());
            for (snap, label) in SNAP_CHOICES {
                if ui.radio(app.options.snap_minutes == snap, label).clicked() {
                    app.set_options(|o| o.snap_minutes = snap);
                    ui.close_menu();
                }
            }
            ui.separator();
            let mut rtl = app.options.rtl;
            if ui.checkbox(&mut rtl, "Right-to-left").changed() {
                app.set_options(|o| o.rtl = rtl);
            }
        });
    });
}
