use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};
use colored::*;
use crate::predict::Prediction;
use crate::zoo::RegistryEntry;

/// Displays a table of cached pretrained models with colorful formatting.
///
/// # Arguments
///
/// * `entries` - Registry entries to display, in display order
pub fn display_models_table(entries: &[RegistryEntry]) {
    if entries.is_empty() {
        println!("{}", "No pretrained models in the zoo cache".yellow());
        return;
    }

    let mut table = Table::new();
    table
        .set_header(vec![
            Cell::new("#").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Name").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Axes").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Rays").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Grid").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Fetched").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
        ])
        .load_preset(comfy_table::presets::UTF8_FULL)
        // Use dynamic content arrangement
        .set_content_arrangement(ContentArrangement::Dynamic);

    for entry in entries {
        let number = entry
            .number
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        let grid = format!(
            "{}x{}x{}",
            entry.grid[0], entry.grid[1], entry.grid[2]
        );
        table.add_row(vec![
            Cell::new(number).fg(comfy_table::Color::White).set_alignment(CellAlignment::Center),
            Cell::new(&entry.name).fg(comfy_table::Color::Green),
            Cell::new(&entry.axes).fg(comfy_table::Color::Magenta).set_alignment(CellAlignment::Center),
            Cell::new(entry.n_rays.to_string()).fg(comfy_table::Color::Blue).set_alignment(CellAlignment::Right),
            Cell::new(grid).fg(comfy_table::Color::Cyan).set_alignment(CellAlignment::Center),
            Cell::new(entry.fetched_at.format("%Y-%m-%d %H:%M:%S").to_string())
                .fg(comfy_table::Color::DarkGrey),
        ]);
    }

    println!("\n{}", format!("Cached models ({}):", entries.len()).bold());
    println!("{table}");
}

/// Displays the details of a single cached model.
pub fn display_model_info(entry: &RegistryEntry) {
    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let rows = [
        ("Name", entry.name.clone()),
        ("Source", entry.url.clone()),
        ("Axes", entry.axes.clone()),
        ("Rays", entry.n_rays.to_string()),
        (
            "Grid",
            format!("{}x{}x{}", entry.grid[0], entry.grid[1], entry.grid[2]),
        ),
        (
            "Fetched",
            entry.fetched_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ),
    ];
    for (label, value) in rows {
        table.add_row(vec![
            Cell::new(label).fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new(value).fg(comfy_table::Color::White),
        ]);
    }

    println!("{table}");
}

/// Displays a summary of an instance prediction, optionally with the fitted
/// ellipsoid of each candidate.
pub fn display_prediction_summary(prediction: &Prediction, with_ellipsoids: bool) {
    println!(
        "{}",
        format!(
            "Found {} candidate{} above threshold {} in a {}x{}x{} field",
            prediction.candidates.len(),
            if prediction.candidates.len() == 1 { "" } else { "s" },
            prediction.threshold,
            prediction.shape[0],
            prediction.shape[1],
            prediction.shape[2],
        )
        .bold()
    );
    if prediction.candidates.is_empty() {
        return;
    }

    let mut table = Table::new();
    table
        .set_header(vec![
            Cell::new("#").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Center (xyz)").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Score").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
        ])
        .load_preset(comfy_table::presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    for (i, candidate) in prediction.candidates.iter().enumerate() {
        table.add_row(vec![
            Cell::new((i + 1).to_string()).fg(comfy_table::Color::White).set_alignment(CellAlignment::Center),
            Cell::new(format!(
                "({:.1}, {:.1}, {:.1})",
                candidate.center[0], candidate.center[1], candidate.center[2]
            ))
            .fg(comfy_table::Color::Green),
            Cell::new(format!("{:.3}", candidate.score))
                .fg(comfy_table::Color::Yellow)
                .set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{table}");

    if with_ellipsoids {
        for (i, candidate) in prediction.candidates.iter().enumerate() {
            match candidate.fit_ellipsoid() {
                Ok(ellipsoid) => {
                    println!("  {} {}", format!("#{}:", i + 1).bold(), quadric_equation(&ellipsoid.coefficients));
                }
                Err(e) => {
                    println!("  {} {}", format!("#{}:", i + 1).bold(), format!("no ellipsoid fit: {}", e).red());
                }
            }
        }
    }
}

/// Formats the quadric coefficients as a readable equation
fn quadric_equation(c: &[f64; 9]) -> String {
    format!(
        "{:.3}x\u{b2} {}y\u{b2} {}z\u{b2} {}xy {}xz {}yz {}x {}y {}z - 1 = 0",
        c[0],
        with_sign(c[1]),
        with_sign(c[2]),
        with_sign(c[3]),
        with_sign(c[4]),
        with_sign(c[5]),
        with_sign(c[6]),
        with_sign(c[7]),
        with_sign(c[8]),
    )
}

/// Formats a coefficient with an explicit leading sign
fn with_sign(value: f64) -> String {
    if value < 0.0 {
        format!("- {:.3}", -value)
    } else {
        format!("+ {:.3}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_sign() {
        assert_eq!(with_sign(0.25), "+ 0.250");
        assert_eq!(with_sign(-0.25), "- 0.250");
    }

    #[test]
    fn test_quadric_equation_shape() {
        let equation = quadric_equation(&[0.25, 0.25, 0.25, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(equation.starts_with("0.250x"));
        assert!(equation.ends_with("- 1 = 0"));
    }
}
