use crate::TOOL_NAME;
use crate::report::model::RunReport;

pub fn render_text(report: &RunReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", TOOL_NAME, report.tool.version));
    if let Some(artifact) = &report.artifact {
        out.push_str(&format!(
            "Artifact: {} ({} bytes, {} {})\n",
            artifact.path.as_deref().unwrap_or("-"),
            artifact.size_bytes,
            artifact.hash.algorithm,
            artifact.hash.value
        ));
    }
    out.push_str(&format!(
        "Build: {} [{}] task {}\n",
        report.build.package, report.build.platform, report.build.task
    ));
    out.push_str(&format!("Assessment: {}\n", report.build.assessment_url));

    match &report.verdict {
        None => out.push_str("Status: submitted\n"),
        Some(verdict) => {
            out.push_str(&format!("Status: {}\n", verdict.task_status));
            match verdict.adjusted_score {
                Some(score) => out.push_str(&format!("Score: {score:.2}\n")),
                None => out.push_str("Score: -\n"),
            }
            if verdict.minimum_score > 0 {
                out.push_str(&format!("Minimum score: {}\n", verdict.minimum_score));
            }
            out.push_str(&format!(
                "Result: {}\n",
                if verdict.passed { "PASS" } else { "FAIL" }
            ));
            if let Some(reason) = &verdict.reason {
                out.push_str(&format!("Reason: {reason}\n"));
            }
        }
    }
    out
}
