//! Render a [`Event`] as the exact output line(s) `spec.md` section 6 specifies.

use repcrec_concurrency::Event;

/// Format one event as the line(s) it prints to stdout.
///
/// [`Event::Dump`] is the only variant that produces more than one line — one per site.
pub fn format_event(event: &Event) -> Vec<String> {
    match event {
        Event::Began { txn } => vec![format!("{txn} begins")],
        Event::Read { txn: _, var, value } => vec![format!("{var}: {value}")],
        Event::Wrote { txn, var, value, sites } => {
            let site_list = sites.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(", ");
            vec![format!("{txn} writes {var}: {value} at sites [{site_list}]")]
        }
        Event::Committed { txn } => vec![format!("{txn} commits")],
        Event::Aborted { txn, cause: Some(cause) } => vec![format!("{txn} aborts ({cause})")],
        Event::Aborted { txn, cause: None } => vec![format!("{txn} aborts")],
        Event::SiteFailed { site, time } => vec![format!("Site {site} fails at time {time}")],
        Event::SiteRecovered { site, time } => vec![format!("Site {site} recovers at time {time}")],
        Event::Dump(report) => report
            .iter()
            .map(|(site, values)| {
                let body = values.iter().map(|(var, value)| format!("{var}: {value}")).collect::<Vec<_>>().join(", ");
                format!("site {site} - {body}")
            })
            .collect(),
    }
}
