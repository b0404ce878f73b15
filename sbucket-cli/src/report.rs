use sbucket_core::{ProbeId, Selection};
use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Parameters of the example one-off ping printed alongside a selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementTemplate {
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default = "default_af")]
    pub af: u8,
    #[serde(default = "default_packets")]
    pub packets: u32,
    #[serde(default = "default_packet_size")]
    pub size: u32,
    /// Seconds between runs.
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl Default for MeasurementTemplate {
    fn default() -> Self {
        MeasurementTemplate {
            target: default_target(),
            af: default_af(),
            packets: default_packets(),
            size: default_packet_size(),
            interval: default_interval(),
            description: None,
            api_url: default_api_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementRequest {
    pub definitions: Vec<Definition>,
    pub probes: Vec<ProbeRequest>,
    pub is_oneoff: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition {
    pub target: String,
    pub af: u8,
    pub packets: u32,
    pub size: u32,
    pub interval: u32,
    pub description: String,
    pub resolve_on_probe: bool,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeRequest {
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub requested: usize,
}

pub fn measurement_request(template: &MeasurementTemplate, ids: &[ProbeId]) -> MeasurementRequest {
    let description = template
        .description
        .clone()
        .unwrap_or_else(|| format!("Ping measurement to {}", template.target));
    MeasurementRequest {
        definitions: vec![Definition {
            target: template.target.clone(),
            af: template.af,
            packets: template.packets,
            size: template.size,
            interval: template.interval,
            description,
            resolve_on_probe: false,
            kind: "ping".to_string(),
        }],
        probes: vec![ProbeRequest {
            value: join_ids(ids),
            kind: "probes".to_string(),
            requested: ids.len(),
        }],
        is_oneoff: true,
    }
}

/// Shell command that would submit `request`.
pub fn curl_command(template: &MeasurementTemplate, request: &MeasurementRequest) -> String {
    let body = serde_json::to_string(request).unwrap_or_else(|_| "{}".to_string());
    format!(
        "curl --dump-header - -H \"Content-Type: application/json\" -H \"Accept: application/json\" \
         -H \"Authorization: Key {API_KEY_PLACEHOLDER}\" -X POST -d {} {}",
        shell_quote(&body),
        shell_quote(&template.api_url)
    )
}

fn join_ids(ids: &[ProbeId]) -> String {
    ids.iter()
        .map(ProbeId::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionReport {
    pub ids: Vec<ProbeId>,
    pub count: usize,
    pub target: usize,
    pub projection: String,
    pub converged: bool,
    pub iterations: usize,
    pub rows: f64,
    pub cols: f64,
    pub filtered: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement: Option<MeasurementRequest>,
}

impl SelectionReport {
    pub fn new(selection: &Selection, target: usize, projection: &str) -> Self {
        let outcome = &selection.outcome;
        SelectionReport {
            ids: selection.ids.clone(),
            count: selection.occupied(),
            target,
            projection: projection.to_string(),
            converged: outcome.converged,
            iterations: outcome.iterations,
            rows: outcome.resolution.rows,
            cols: outcome.resolution.cols,
            filtered: selection.filtered,
            skipped: outcome.skipped.len(),
            measurement: None,
        }
    }
}

/// Plain-text report. Verbosity 1 adds counts, 2 the example request.
pub fn print_text(report: &SelectionReport, template: &MeasurementTemplate, verbose: u8) {
    if verbose >= 1 {
        println!("selected probes:");
    }
    println!("{}", serde_json::to_string(&report.ids).unwrap_or_default());

    if verbose >= 1 {
        println!("count: {}", report.count);
        if !report.converged {
            println!(
                "[!] target {} not reached within {} iterations",
                report.target, report.iterations
            );
        }
        println!(
            "probes: {} after filtering, {} without usable projection",
            report.filtered, report.skipped
        );
    }

    if verbose >= 2 {
        let request = measurement_request(template, &report.ids);
        println!();
        println!("example measurement creation:");
        println!("{}", curl_command(template, &request));
    }
}

fn default_target() -> String {
    DEFAULT_MEASUREMENT_TARGET.to_string()
}

fn default_af() -> u8 {
    DEFAULT_AF
}

fn default_packets() -> u32 {
    DEFAULT_PACKETS
}

fn default_packet_size() -> u32 {
    DEFAULT_PACKET_SIZE
}

fn default_interval() -> u32 {
    DEFAULT_INTERVAL_SECS
}

fn default_api_url() -> String {
    DEFAULT_MEASUREMENT_API.to_string()
}
