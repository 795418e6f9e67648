//! Plain-text summaries of FHIR resources for tool results
//!
//! Missing elements render as a placeholder instead of failing: servers in the
//! wild omit most optional fields.

use crate::tools::quality::AssessmentEnvelope;
use data_quality::ResourceAssessment;
use fhir_client::{Bundle, FetchOutcome};
use serde_json::Value;

/// String at a JSON pointer, or `default`
fn text_at<'a>(resource: &'a Value, pointer: &str, default: &'a str) -> &'a str {
    resource.pointer(pointer).and_then(Value::as_str).unwrap_or(default)
}

/// Display text of a CodeableConcept: `text`, else the first coding's display
pub fn concept_text(concept: Option<&Value>, default: &str) -> String {
    let Some(concept) = concept else {
        return default.to_string();
    };
    concept
        .get("text")
        .and_then(Value::as_str)
        .or_else(|| concept.pointer("/coding/0/display").and_then(Value::as_str))
        .unwrap_or(default)
        .to_string()
}

/// First HumanName as "given family"
pub fn human_name(resource: &Value) -> String {
    let Some(name) = resource.pointer("/name/0") else {
        return "Unknown Name".to_string();
    };
    let given = name
        .get("given")
        .and_then(Value::as_array)
        .map(|given| given.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    let family = text_at(name, "/family", "");
    let full = format!("{} {}", given, family).trim().to_string();
    if full.is_empty() {
        "Unknown Name".to_string()
    } else {
        full
    }
}

/// Last path segment of a literal reference (`Patient/123` -> `123`)
pub fn reference_id(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

pub fn patient_details(patient: &Value) -> String {
    let mut lines = vec![
        "Patient found:".to_string(),
        format!("ID: {}", text_at(patient, "/id", "Unknown")),
        format!("Name: {}", human_name(patient)),
        format!("Date of Birth: {}", text_at(patient, "/birthDate", "Unknown")),
        format!("Gender: {}", text_at(patient, "/gender", "Unknown")),
    ];

    if let Some(address) = patient.pointer("/address/0") {
        let location = [
            text_at(address, "/city", ""),
            text_at(address, "/state", ""),
            text_at(address, "/country", ""),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
        if !location.is_empty() {
            lines.push(format!("Location: {}", location));
        }
    }

    for contact in patient.get("telecom").and_then(Value::as_array).into_iter().flatten() {
        let value = text_at(contact, "/value", "Unknown");
        match contact.get("system").and_then(Value::as_str) {
            Some("phone") => lines.push(format!("Phone: {}", value)),
            Some("email") => lines.push(format!("Email: {}", value)),
            _ => {}
        }
    }

    lines.join("\n")
}

pub fn patient_line(patient: &Value) -> String {
    format!(
        "- ID: {} | Name: {} | DOB: {} | Gender: {}",
        text_at(patient, "/id", "Unknown"),
        human_name(patient),
        text_at(patient, "/birthDate", "Unknown"),
        text_at(patient, "/gender", "Unknown"),
    )
}

pub fn observation_line(observation: &Value) -> String {
    let value = if let Some(text) = observation.get("valueString").and_then(Value::as_str) {
        text.to_string()
    } else if let Some(quantity) = observation.get("valueQuantity") {
        match (quantity.get("value"), quantity.get("unit").and_then(Value::as_str)) {
            (Some(value), Some(unit)) => format!("{} {}", value, unit),
            (Some(value), None) => value.to_string(),
            (None, _) => "No value".to_string(),
        }
    } else if observation.get("valueCodeableConcept").is_some() {
        concept_text(observation.get("valueCodeableConcept"), "No value")
    } else {
        "No value".to_string()
    };

    format!(
        "- ID: {} | {} | Value: {}",
        text_at(observation, "/id", "Unknown"),
        concept_text(observation.get("code"), "Unknown observation"),
        value,
    )
}

pub fn condition_line(condition: &Value) -> String {
    let patient = condition
        .pointer("/subject/reference")
        .and_then(Value::as_str)
        .map_or("Unknown patient", reference_id);

    format!(
        "- ID: {} | Patient: {} | {} | Status: {} | Onset: {}",
        text_at(condition, "/id", "Unknown"),
        patient,
        concept_text(condition.get("code"), "Unknown condition"),
        text_at(condition, "/clinicalStatus/coding/0/code", "Unknown"),
        text_at(condition, "/onsetDateTime", "Unknown onset"),
    )
}

pub fn medication_request_line(request: &Value) -> String {
    format!(
        "- ID: {} | {} | Status: {} | Intent: {} | Date: {}",
        text_at(request, "/id", "Unknown"),
        concept_text(request.get("medicationCodeableConcept"), "Unknown medication"),
        text_at(request, "/status", "Unknown"),
        text_at(request, "/intent", "Unknown"),
        text_at(request, "/authoredOn", "Unknown date"),
    )
}

pub fn diagnostic_report_line(report: &Value) -> String {
    format!(
        "- ID: {} | {} | Category: {} | Status: {} | Date: {}",
        text_at(report, "/id", "Unknown"),
        concept_text(report.get("code"), "Unknown report"),
        concept_text(report.pointer("/category/0"), "Unknown category"),
        text_at(report, "/status", "Unknown"),
        text_at(report, "/effectiveDateTime", "Unknown date"),
    )
}

pub fn care_plan_line(plan: &Value) -> String {
    format!(
        "- ID: {} | {} | Category: {} | Status: {} | Intent: {} | Created: {}",
        text_at(plan, "/id", "Unknown"),
        text_at(plan, "/title", "Untitled plan"),
        concept_text(plan.pointer("/category/0"), "Unknown category"),
        text_at(plan, "/status", "Unknown"),
        text_at(plan, "/intent", "Unknown"),
        text_at(plan, "/created", "Unknown date"),
    )
}

/// Header plus one line per entry for the first `shown` entries of a search page
pub fn search_page(noun: &str, heading: &str, bundle: &Bundle, shown: usize, line: fn(&Value) -> String) -> String {
    let resources: Vec<&Value> = bundle.resources().collect();
    let mut lines = Vec::with_capacity(resources.len().min(shown) + 3);

    match bundle.total {
        Some(total) => lines.push(format!("Found {} {} total", total, noun)),
        None => lines.push(format!("Found {} {} (the server did not report a total)", resources.len(), noun)),
    }
    lines.push(format!("Returned {} entries in this page", resources.len()));

    if resources.is_empty() {
        lines.push(format!("No {} found", noun));
    } else {
        lines.push(String::new());
        lines.push(format!("{}:", heading));
        lines.extend(resources.iter().take(shown).copied().map(line));
        if resources.len() > shown {
            lines.push(format!("... and {} more in this page", resources.len() - shown));
        }
    }

    lines.join("\n")
}

pub fn capability_statement(statement: &Value) -> String {
    let mut lines = vec![
        format!("FHIR Version: {}", text_at(statement, "/fhirVersion", "Unknown")),
        format!("Publisher: {}", text_at(statement, "/publisher", "Unknown")),
    ];
    if let Some(software) = statement.pointer("/software/name").and_then(Value::as_str) {
        let version = text_at(statement, "/software/version", "");
        lines.push(format!("Software: {} {}", software, version).trim_end().to_string());
    }

    if let Some(rest) = statement.get("rest").and_then(Value::as_array) {
        lines.push(format!("REST endpoints: {}", rest.len()));
        if let Some(resources) = rest
            .iter()
            .find_map(|endpoint| endpoint.get("resource").and_then(Value::as_array))
        {
            lines.push(format!("Supported resources: {}", resources.len()));
        }
    }

    lines.join("\n")
}

fn outcome_text(outcome: &FetchOutcome) -> String {
    match outcome {
        FetchOutcome::Success => "retrieved".to_string(),
        FetchOutcome::PartialFailure { failure } => format!("partially retrieved ({})", failure),
        FetchOutcome::Failure { failure } => format!("not retrieved ({})", failure),
    }
}

fn section(lines: &mut Vec<String>, assessment: &ResourceAssessment) {
    let icon = if assessment.fetch_outcome.is_sampled() { "📊" } else { "❌" };
    lines.push(format!("{} {} Resource:", icon, assessment.resource_type));
    lines.push(format!("  Outcome: {}", outcome_text(&assessment.fetch_outcome)));
    lines.push(format!(
        "  Sampled: {} of {} requested",
        assessment.returned_count, assessment.requested_count
    ));
    lines.push(format!(
        "  📈 Quality Score: {:.1}/100 (weight {})",
        assessment.score, assessment.weight
    ));
    let refs = &assessment.references;
    if refs.total > 0 {
        lines.push(format!(
            "  🔗 References: {} checked, {} resolved, {} unverifiable, {} orphaned, {} malformed",
            refs.total, refs.resolved, refs.unverifiable, refs.orphaned, refs.malformed
        ));
    }
    lines.push(String::new());
}

/// Readable rendering of an assessment run
pub fn quality_report(envelope: &AssessmentEnvelope) -> String {
    let report = &envelope.report;
    let mut lines = vec![
        "FHIR Server Data Quality Assessment".to_string(),
        format!("Server: {}", envelope.server_url),
        format!("Timestamp: {}", envelope.assessed_at.to_rfc3339()),
        format!("Run: {}", envelope.run_id),
        String::new(),
    ];

    if report.resource_types.is_empty() {
        lines.push("No resource types were assessed.".to_string());
    }
    for assessment in &report.resource_types {
        section(&mut lines, assessment);
    }

    if report.issues.is_empty() {
        lines.push("✅ No issues detected".to_string());
    } else {
        lines.push("⚠️  Issues Found:".to_string());
        lines.extend(report.issues.iter().map(|issue| {
            format!("  - {}: [{}] {}", issue.severity, issue.resource_type, issue.description)
        }));
    }
    lines.push(String::new());

    lines.push(format!("🎯 Overall Data Quality Score: {}/100", report.score));
    lines.push(report.rating.to_string());
    lines.join("\n")
}
