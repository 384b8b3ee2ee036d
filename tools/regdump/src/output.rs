//! Table and JSON rendering

use anyhow::Result;
use colored::*;
use regmap::StatusCode;
use serde::Serialize;

use crate::commands::{DecodeReport, DeviceSummary, EncodeReport, LayoutReport, Report};
use crate::config::OutputFormat;

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_report(report: &Report, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(report);
    }
    let text = match report {
        Report::Layout(r) => render_layout(r),
        Report::Decode(r) => render_decode(r),
        Report::Encode(r) => render_encode(r),
    };
    print!("{}", text);
    Ok(())
}

pub fn print_devices(devices: &[DeviceSummary], format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(&devices);
    }
    println!("{}", "Built-in devices".bright_cyan());
    for device in devices {
        println!(
            "  {:16} {:>2} blocks {:>3} fields  {}",
            device.name.bright_yellow(),
            device.blocks,
            device.fields,
            device.description
        );
    }
    Ok(())
}

fn status_label(code: StatusCode) -> ColoredString {
    let name = code.name();
    if code.is_good() {
        name.green()
    } else if code.is_bad() {
        name.red()
    } else {
        name.yellow()
    }
}

fn with_unit(value: &str, unit: &str) -> String {
    if unit.is_empty() {
        value.to_string()
    } else {
        format!("{} {}", value, unit)
    }
}

pub fn render_layout(report: &LayoutReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", report.device.bright_cyan()));
    for block in &report.blocks {
        out.push_str(&format!(
            "\n{} @ {} ({} registers)\n",
            block.name.bright_yellow(),
            block.base_offset,
            block.register_count
        ));
        out.push_str(&format!(
            "  {:<22} {:>6} {:>4}  {:<9} {:<3} {:<5} {:>6}  {}\n",
            "FIELD", "OFFSET", "LEN", "TYPE", "RW", "ORDER", "SCALE", "UNIT"
        ));
        for field in &block.fields {
            out.push_str(&format!(
                "  {:<22} {:>6} {:>4}  {:<9} {:<3} {:<5} {:>6}  {}\n",
                field.name,
                field.offset,
                field.length,
                field.data_type,
                field.access.as_str(),
                field.order,
                field.scale,
                field.unit
            ));
        }
        if !block.gaps.is_empty() {
            let gaps: Vec<String> = block.gaps.iter().map(u16::to_string).collect();
            out.push_str(&format!("  gaps: {}\n", gaps.join(", ").dimmed()));
        }
    }
    out
}

pub fn render_decode(report: &DecodeReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} / {} @ {}\n",
        report.device.bright_cyan(),
        report.block.bright_yellow(),
        report.base_offset
    ));
    out.push_str(&format!("  {:<22} {:>14}  {}\n", "FIELD", "RAW", "VALUE"));
    for field in &report.fields {
        out.push_str(&format!(
            "  {:<22} {:>14}  {}\n",
            field.name,
            field.raw.to_string(),
            with_unit(&field.display, field.unit)
        ));
    }
    out.push_str(&format!(
        "status: {} ({})\n",
        status_label(report.status),
        report.explanation
    ));
    out
}

pub fn render_encode(report: &EncodeReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} / {} @ {}\n",
        report.device.bright_cyan(),
        report.block.bright_yellow(),
        report.base_offset
    ));
    for (i, word) in report.words.iter().enumerate() {
        out.push_str(&format!(
            "  {:>5}  0x{:04X}\n",
            usize::from(report.base_offset) + i,
            word
        ));
    }
    out.push_str(&format!("hex: {}\n", report.hex));
    out
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::commands::{decode, encode, layout};
    use regmap::devices::{EnergyMeter, PelletBoiler};

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_render_decode_shows_units_and_status() {
        plain();
        let mut words = vec![0u16; 12];
        words[0] = 652;
        let text = render_decode(&decode::<PelletBoiler>("measurements", &words).unwrap());
        assert!(text.starts_with("pellet_boiler / measurements @ 0\n"));
        assert!(text.contains("65.2 °C"));
        assert!(text.contains("status: Good ("));
    }

    #[test]
    fn test_render_encode_uses_absolute_addresses() {
        plain();
        let report = encode::<EnergyMeter>("config", &["CtRatio=40".parse().unwrap()], 0).unwrap();
        let text = render_encode(&report);
        assert!(text.contains("768  0x0028"));
        assert!(text.ends_with("hex: 0028\n"));
    }

    #[test]
    fn test_render_layout_lists_gaps() {
        plain();
        let text = render_layout(&layout::<PelletBoiler>().unwrap());
        assert!(text.contains("measurements @ 0 (12 registers)"));
        assert!(text.contains("gaps: 5, 11"));
    }

    #[test]
    fn test_json_report_is_untagged() {
        let report = Report::Encode(encode::<EnergyMeter>("config", &[], 0).unwrap());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["block"], "config");
        assert_eq!(json["words"], serde_json::json!([0]));
    }
}
