//! Terminal and JSON output

use std::fmt::Write as _;

use colored::Colorize;
use lan_watch::{DeviceRecord, Ledger, ScanReport};

const RULE_WIDTH: usize = 92;

fn status_cell(record: &DeviceRecord) -> String {
    let cell = format!("{:<8}", record.status());
    if record.is_new() {
        cell.yellow().bold().to_string()
    } else if record.is_known() {
        cell.green().to_string()
    } else {
        cell.dimmed().to_string()
    }
}

/// Device table for one sweep
pub fn device_table(report: &ScanReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        format!(
            "{:<16} {:<18} {:<20} {:<24} {:<8}",
            "IP Address", "MAC Address", "Vendor", "Device Type", "Status"
        )
        .bold()
    );
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));

    for record in report.records() {
        let mac = record
            .hardware_address()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:<16} {:<18} {:<20} {:<24} {}",
            record.address(),
            mac,
            record.vendor(),
            record.device_type().label(),
            status_cell(record)
        );
    }

    out
}

/// Summary lines for one sweep
pub fn summary(report: &ScanReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total devices found: {}", report.total());
    let _ = writeln!(out, "Known devices: {}", report.known_count());
    let new = format!("New devices: {}", report.new_count());
    if report.new_count() > 0 {
        let _ = writeln!(out, "{}", new.yellow().bold());
    } else {
        let _ = writeln!(out, "{}", new);
    }
    if !report.errors().is_empty() {
        let _ = writeln!(
            out,
            "{}",
            format!("Probe errors: {}", report.errors().len()).red()
        );
        for error in report.errors() {
            let _ = writeln!(out, "  {}: {}", error.address, error.message);
        }
    }
    if report.cancelled() {
        let _ = writeln!(out, "{}", "Scan interrupted; results are partial".red());
    }
    out
}

/// Print a sweep to stdout, as a table or as JSON
pub fn print_report(report: &ScanReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!();
        print!("{}", device_table(report));
        println!();
        print!("{}", summary(report));
    }
    Ok(())
}

/// Table of accepted devices
pub fn known_table(ledger: &Ledger) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        format!(
            "{:<18} {:<16} {:<20} {:<20} {:<24} {}",
            "MAC Address", "Last IP", "Name", "Vendor", "Device Type", "First Seen"
        )
        .bold()
    );
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH + 24));

    for entry in ledger.entries() {
        let name = entry
            .friendly_name
            .as_deref()
            .or(entry.hostname.as_deref())
            .unwrap_or("-");
        let _ = writeln!(
            out,
            "{:<18} {:<16} {:<20} {:<20} {:<24} {}",
            entry.hardware_address.to_string(),
            entry.address.to_string(),
            name,
            entry.vendor,
            entry.device_type.label(),
            entry.first_seen.format("%Y-%m-%d %H:%M")
        );
    }

    let _ = writeln!(out, "\n{} known device(s)", ledger.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lan_detect::{DeviceType, HardwareAddress};
    use lan_watch::LedgerEntry;
    use std::net::Ipv4Addr;

    fn report() -> ScanReport {
        ScanReport::from_records(vec![
            DeviceRecord::new(
                Ipv4Addr::new(192, 168, 1, 1),
                Some(HardwareAddress::new([0xAA, 0xBB, 0xCC, 0, 0, 1])),
                None,
                "Unknown",
                DeviceType::Unknown,
                true,
                Utc::now(),
            ),
            DeviceRecord::new(
                Ipv4Addr::new(192, 168, 1, 20),
                Some(HardwareAddress::new([0xB8, 0x27, 0xEB, 1, 2, 3])),
                Some("octopi".into()),
                "Raspberry Pi",
                DeviceType::RaspberryPi,
                false,
                Utc::now(),
            ),
        ])
    }

    #[test]
    fn test_device_table_rows() {
        colored::control::set_override(false);
        let table = device_table(&report());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("IP Address"));
        assert!(lines[2].starts_with("192.168.1.1 "));
        assert!(lines[2].contains("AA:BB:CC:00:00:01"));
        assert!(lines[2].trim_end().ends_with("Known"));
        assert!(lines[3].contains("Raspberry Pi"));
        assert!(lines[3].trim_end().ends_with("NEW"));
    }

    #[test]
    fn test_summary_counts() {
        colored::control::set_override(false);
        let text = summary(&report());
        assert!(text.contains("Total devices found: 2"));
        assert!(text.contains("Known devices: 1"));
        assert!(text.contains("New devices: 1"));
        assert!(!text.contains("interrupted"));
    }

    #[test]
    fn test_known_table_prefers_friendly_name() {
        colored::control::set_override(false);
        let mut ledger = Ledger::in_memory();
        ledger.upsert(LedgerEntry {
            hardware_address: HardwareAddress::new([0xB8, 0x27, 0xEB, 1, 2, 3]),
            address: Ipv4Addr::new(192, 168, 1, 20),
            hostname: Some("octopi".into()),
            vendor: "Raspberry Pi".into(),
            device_type: DeviceType::RaspberryPi,
            first_seen: Utc::now(),
            friendly_name: Some("3D printer".into()),
        });

        let table = known_table(&ledger);
        assert!(table.contains("3D printer"));
        assert!(!table.contains("octopi"));
        assert!(table.contains("1 known device(s)"));
    }
}
