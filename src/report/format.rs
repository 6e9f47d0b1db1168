//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the negotiation/fitting code stays free of presentation concerns
//! - output changes are localized

use crate::domain::{NegotiationOutcome, NegotiationResult, RunConfig};
use crate::fit::{FitQuality, FittedCurve};
use crate::report::ResidualRow;

/// Format the negotiation outcome and its failure log.
pub fn format_negotiation(result: &NegotiationResult, config: &RunConfig) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Link: port={} | interface={} | candidates={}\n",
        config.port,
        config.interface.display_name(),
        config.speeds.len()
    ));

    for f in &result.failures {
        out.push_str(&format!(
            "  x {:>12}  {:<15} {}\n",
            f.speed.to_string(),
            f.stage.display_name(),
            f.message
        ));
    }

    match &result.outcome {
        NegotiationOutcome::Succeeded { speed, samples } => {
            out.push_str(&format!(
                "  * {:>12}  acquired {} samples at {}\n",
                speed.to_string(),
                samples.len(),
                samples.acquired_at().format("%Y-%m-%d %H:%M:%S")
            ));
        }
        NegotiationOutcome::Exhausted => {
            out.push_str(&format!(
                "No candidate speed worked ({} tried).\n",
                result.failures.len()
            ));
        }
        NegotiationOutcome::Aborted => {
            out.push_str("Negotiation aborted: port/interface configuration failed.\n");
        }
    }

    out
}

/// Format the fitted polynomial and its diagnostics.
pub fn format_fit_summary(curve: &FittedCurve, quality: &FitQuality) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "\nPolynomial fit: degree={} | n={}\n",
        curve.degree(),
        quality.n
    ));
    out.push_str(&format!("  y(x) = {}\n", format_polynomial(curve)));
    for (i, c) in curve.coefficients().as_slice().iter().enumerate() {
        out.push_str(&format!("  c{i} = {c:+.9e}\n"));
    }

    let r2 = quality
        .r_squared
        .map(|v| format!("{v:.6}"))
        .unwrap_or_else(|| "-".to_string());
    out.push_str(&format!(
        "  SSE={:.6e} RMSE={:.6e} max|r|={:.6e} R²={}\n",
        quality.sse, quality.rmse, quality.max_abs_residual, r2
    ));

    out
}

/// Format the per-sample residual table.
pub fn format_residual_table(rows: &[ResidualRow]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>5} {:>10} {:>12} {:>12} {:>12}\n",
        "x", "raw", "measured", "fitted", "residual"
    ));
    out.push_str(&format!(
        "{:-<5} {:-<10} {:-<12} {:-<12} {:-<12}\n",
        "", "", "", "", ""
    ));
    for r in rows {
        out.push_str(&format!(
            "{:>5} {:>10} {:>12.5} {:>12.5} {:>12.5}\n",
            r.index, r.raw, r.scaled, r.fitted, r.residual
        ));
    }
    out
}

/// Format extra evaluations of the fitted curve.
pub fn format_evaluations(curve: &FittedCurve, xs: &[f64]) -> String {
    let mut out = String::new();
    if xs.is_empty() {
        return out;
    }
    out.push_str("\nEvaluations:\n");
    for &x in xs {
        out.push_str(&format!("  y({x}) = {:.6}\n", curve.evaluate(x)));
    }
    out
}

fn format_polynomial(curve: &FittedCurve) -> String {
    let mut terms = Vec::new();
    for (i, &c) in curve.coefficients().as_slice().iter().enumerate() {
        let term = match i {
            0 => format!("{c:.6e}"),
            1 => format!("{c:.6e}·x"),
            _ => format!("{c:.6e}·x^{i}"),
        };
        terms.push(term);
    }
    if terms.is_empty() {
        "0".to_string()
    } else {
        terms.join(" + ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        BaudRate, CoefficientVector, FailureEntry, FailureStage, InterfaceMode, Sample, SampleSet,
    };

    fn config() -> RunConfig {
        RunConfig {
            port: "COM3".to_string(),
            interface: InterfaceMode::Rs422,
            speeds: vec![BaudRate::new(9_600), BaudRate::new(115_200)],
            sample_count: 2,
            degree: 1,
            eval_points: Vec::new(),
            plot: false,
            plot_width: 40,
            plot_height: 10,
        }
    }

    #[test]
    fn negotiation_report_lists_failures_and_winner() {
        let result = NegotiationResult {
            outcome: NegotiationOutcome::Succeeded {
                speed: BaudRate::new(115_200),
                samples: SampleSet::new(vec![Sample { raw: 1, scaled: 1.0 }; 2]),
            },
            failures: vec![FailureEntry {
                speed: BaudRate::new(9_600),
                stage: FailureStage::PollFailed,
                message: "garbled".to_string(),
            }],
        };
        let txt = format_negotiation(&result, &config());
        assert!(txt.starts_with("Link: port=COM3 | interface=RS422 | candidates=2\n"));
        assert!(txt.contains("9600 Bd  poll failed     garbled"));
        assert!(txt.contains("115200 Bd  acquired 2 samples"));
    }

    #[test]
    fn negotiation_report_distinguishes_abort_from_exhaustion() {
        let aborted = NegotiationResult {
            outcome: NegotiationOutcome::Aborted,
            failures: Vec::new(),
        };
        let exhausted = NegotiationResult {
            outcome: NegotiationOutcome::Exhausted,
            failures: Vec::new(),
        };
        assert!(format_negotiation(&aborted, &config()).contains("aborted"));
        assert!(format_negotiation(&exhausted, &config()).contains("No candidate speed worked"));
    }

    #[test]
    fn polynomial_terms_in_ascending_power() {
        let curve = FittedCurve::new(CoefficientVector::new(vec![1.0, 2.0, 3.0]));
        assert_eq!(
            format_polynomial(&curve),
            "1.000000e0 + 2.000000e0·x + 3.000000e0·x^2"
        );
    }

    #[test]
    fn evaluations_empty_when_no_points() {
        let curve = FittedCurve::new(CoefficientVector::new(vec![1.0]));
        assert_eq!(format_evaluations(&curve, &[]), "");
        assert!(format_evaluations(&curve, &[-2.5]).contains("y(-2.5) = 1.000000"));
    }
}
