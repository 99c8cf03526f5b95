use crate::models::{LocationSample, OverlayStyle};

/// Builds the fixed-order line block burned into a photo.
///
/// Coordinates always print with six decimal digits and a period decimal
/// separator so the stamped text stays machine-parseable regardless of the
/// device locale. City, address and note lines are emitted only when they
/// have content; accuracy prints `±0m` when the provider gave no estimate.
pub fn format_location_block(sample: &LocationSample, style: &OverlayStyle) -> Vec<String> {
    let mut lines = Vec::with_capacity(7);
    lines.push(format!(
        "Lat: {:.6}, Lon: {:.6}",
        sample.latitude, sample.longitude
    ));
    lines.push(format!(
        "Precisión: ±{:.0}m",
        sample.accuracy_meters.unwrap_or(0.0)
    ));
    lines.push(format!("Fecha: {}", sample.captured_at.format("%Y-%m-%d")));
    lines.push(format!("Hora: {}", sample.captured_at.format("%H:%M:%S")));
    if !sample.place_city.is_empty() {
        lines.push(format!("Ciudad: {}", sample.place_city));
    }
    if !sample.place_address.is_empty() {
        lines.push(format!("Dirección: {}", sample.place_address));
    }
    if style.note_enabled && !style.note_text.trim().is_empty() {
        lines.push(format!("Nota: {}", style.note_text));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample() -> LocationSample {
        LocationSample {
            latitude: 40.0,
            longitude: -3.0,
            accuracy_meters: Some(10.0),
            captured_at: Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 5).unwrap(),
            place_city: "Madrid".to_string(),
            place_address: "Gran Via 1".to_string(),
        }
    }

    #[test]
    fn full_block_in_fixed_order() {
        let lines = format_location_block(&sample(), &OverlayStyle::default());
        assert_eq!(
            lines,
            vec![
                "Lat: 40.000000, Lon: -3.000000",
                "Precisión: ±10m",
                "Fecha: 2024-06-15",
                "Hora: 09:30:05",
                "Ciudad: Madrid",
                "Dirección: Gran Via 1",
            ]
        );
    }

    #[test]
    fn skips_empty_place_fields() {
        let mut s = sample();
        s.place_city.clear();
        s.place_address.clear();
        let lines = format_location_block(&s, &OverlayStyle::default());
        assert_eq!(lines.len(), 4);
        assert!(!lines.iter().any(|l| l.starts_with("Ciudad")));
        assert!(!lines.iter().any(|l| l.starts_with("Dirección")));
    }

    #[test]
    fn missing_accuracy_prints_zero() {
        let mut s = sample();
        s.accuracy_meters = None;
        let lines = format_location_block(&s, &OverlayStyle::default());
        assert_eq!(lines[1], "Precisión: ±0m");
    }

    #[test]
    fn note_line_only_when_enabled_and_non_blank() {
        let mut style = OverlayStyle {
            note_enabled: true,
            note_text: "Arqueta A-3".to_string(),
            ..OverlayStyle::default()
        };
        let lines = format_location_block(&sample(), &style);
        assert_eq!(lines.last().map(String::as_str), Some("Nota: Arqueta A-3"));

        style.note_text = "   ".to_string();
        let lines = format_location_block(&sample(), &style);
        assert!(!lines.iter().any(|l| l.starts_with("Nota")));

        style.note_enabled = false;
        style.note_text = "ignored".to_string();
        let lines = format_location_block(&sample(), &style);
        assert!(!lines.iter().any(|l| l.starts_with("Nota")));
    }

    #[test]
    fn coordinates_round_to_six_decimals() {
        let mut s = sample();
        s.latitude = 40.123456789;
        s.longitude = -3.0000004;
        let lines = format_location_block(&s, &OverlayStyle::default());
        assert_eq!(lines[0], "Lat: 40.123457, Lon: -3.000000");
    }
}
