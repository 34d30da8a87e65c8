//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays free of presentation concerns
//! - output changes are localized

use crate::io::record::{FitRecord, RecordRow};
use crate::models::TwoCircleShape;
use crate::report::summarize_track;

/// Format the run summary: inputs, settings, outcome and track statistics.
pub fn format_run_summary(record: &FitRecord) -> String {
    let mut out = String::new();
    let s = &record.settings;

    out.push_str("=== tcfit - Two-Circle Fit ===\n");
    out.push_str(&format!("Generated: {}\n", record.generated_at.format("%Y-%m-%d %H:%M:%S UTC")));
    let inputs: Vec<String> = record.inputs.iter().map(|p| p.display().to_string()).collect();
    out.push_str(&format!("Inputs: {}\n", if inputs.is_empty() { "-".to_string() } else { inputs.join(", ") }));
    out.push_str(&format!("Start: {}\n", record.start));
    out.push_str(&format!("Slices: {} ({} visited)\n", record.range, record.rows.len()));
    out.push_str(&format!(
        "Method: {} | objective: {} | interpolation: {:?}\n",
        s.method.display_name(),
        s.objective.display_name(),
        s.interpolation
    ));
    out.push_str(&format!(
        "Samples: {} | max_iter={} | tol={:e} | on_error={:?}\n",
        s.sample_count, s.options.max_iterations, s.options.tolerance, s.on_error
    ));
    out.push_str(&format!("Bounds: lower={}\n", fmt_params(&s.bounds.lower)));
    out.push_str(&format!("        upper={}\n", fmt_params(&s.bounds.upper)));

    let fitted = record.rows.iter().filter(|r| r.params.is_some()).count();
    let not_converged = record.rows.iter().filter(|r| r.converged == Some(false)).count();
    out.push_str(&format!("\nFitted: {fitted}/{}", record.rows.len()));
    if not_converged > 0 {
        out.push_str(&format!(" ({not_converged} at the iteration cap)"));
    }
    if record.cancelled {
        out.push_str(" [cancelled]");
    }
    out.push('\n');
    for skipped in &record.skipped {
        out.push_str(&format!("  (skipped frame {}) {}\n", skipped.slice, skipped.reason));
    }

    if let Some(track) = summarize_track(&record.shapes()) {
        out.push_str(&format!("\nTrack (frames {}..{}):\n", track.first_frame, track.last_frame));
        for k in 0..2 {
            let (dx, dy) = track.center_shift[k];
            let (rmin, rmax) = track.radius_range[k];
            out.push_str(&format!(
                "- circle {}: shift=({dx:+.2}, {dy:+.2}) r=[{rmin:.2}, {rmax:.2}]\n",
                k + 1
            ));
        }
    }
    out.push('\n');

    out
}

/// Format the per-frame results table. Absent frames show blank values.
pub fn format_results_table(rows: &[RecordRow]) -> String {
    let mut out = String::new();
    let names = TwoCircleShape::parameter_names();

    out.push_str(
        format!(
            "{:>6} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>11} {:>5}",
            "Frame", names[0], names[1], names[2], names[3], names[4], names[5], "objective", "conv"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(&format!(
        "{:-<6} {:-<9} {:-<9} {:-<9} {:-<9} {:-<9} {:-<9} {:-<11} {:-<5}\n",
        "", "", "", "", "", "", "", "", ""
    ));

    for row in rows {
        let line = match (row.params, row.objective) {
            (Some(p), Some(value)) => format!(
                "{:>6} {:>9.3} {:>9.3} {:>9.3} {:>9.3} {:>9.3} {:>9.3} {:>11.6} {:>5}",
                row.frame,
                p[0],
                p[1],
                p[2],
                p[3],
                p[4],
                p[5],
                value,
                if row.converged == Some(false) { "no" } else { "yes" }
            ),
            _ => format!("{:>6}", row.frame),
        };
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

fn fmt_params(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.2}")).collect();
    format!("[{}]", parts.join(", "))
}
