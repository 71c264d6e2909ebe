use std::path::Path;

use super::super::util::{escape_ffmpeg_path, format_time, overlay_text_path};
use super::{DubCompiler, FilterChain};
use crate::dub::overlay::OverlayElement;

impl DubCompiler {
    /// Chain one band+text stage per overlay, in list order, so later
    /// elements draw over earlier ones. Returns the final video label.
    pub(super) fn apply_overlays(
        &self,
        filters: &mut FilterChain,
        overlays: &[OverlayElement],
        text_dir: &Path,
        input_label: &str,
    ) -> String {
        let mut current_label = input_label.to_string();

        for (position, element) in overlays.iter().enumerate() {
            let output_label = format!("ov_{position}");
            let text_file = overlay_text_path(text_dir, position);
            filters.push(format!(
                "[{input}]{stage}[{output}]",
                input = current_label,
                stage = self.build_overlay_stage(element, &text_file),
                output = output_label,
            ));
            current_label = output_label;
        }

        current_label
    }

    fn build_overlay_stage(&self, element: &OverlayElement, text_file: &Path) -> String {
        let enable_condition = format!(
            "between(t,{},{})",
            format_time(element.start_offset),
            format_time(element.end_offset())
        );
        let geometry = &element.geometry;

        let band = format!(
            "drawbox=x={x}:y={y}:w={w}:h={h}:color={color}:t=fill:enable='{condition}'",
            x = geometry.x,
            y = geometry.y,
            w = geometry.width,
            h = geometry.height,
            color = self.style.band_color,
            condition = enable_condition,
        );

        // An empty subtitle still gets its band.
        if element.content.is_empty() {
            return band;
        }

        let mut text = format!(
            "drawtext=textfile='{path}':expansion=none:x={x}:y={baseline}-ascent:fontsize={size}:fontcolor={color}",
            path = escape_ffmpeg_path(text_file),
            x = geometry.x + geometry.text_x,
            baseline = geometry.y + geometry.text_baseline,
            size = self.style.font_size,
            color = self.style.font_color,
        );
        if let Some(font_file) = &self.style.font_file {
            text.push_str(&format!(":fontfile='{}'", escape_ffmpeg_path(font_file)));
        }
        text.push_str(&format!(":enable='{enable_condition}'"));

        format!("{band},{text}")
    }
}
