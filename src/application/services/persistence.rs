//! Tab-separated member file codec
//!
//! One header line, then one row per member:
//! `id  name  sponsorId  ownSales  commissionRate  status  phone  balance`.
//! Rows are written in pre-order so every sponsor precedes its downline and
//! sibling order survives a round trip.

use std::collections::HashSet;

use generational_arena::Index;
use tracing::{debug, instrument, warn};

use crate::domain::{Hierarchy, Member, MemberStatus, Topology};

pub const HEADER: &str = "id\tname\tsponsorId\townSales\tcommissionRate\tstatus\tphone\tbalance";
const FIELD_COUNT: usize = 8;

/// What a load had to leave out or repair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// 1-based line numbers of rows that could not be parsed
    pub skipped_lines: Vec<usize>,
    /// Members whose sponsor could not be linked and became top-level
    pub orphaned: Vec<String>,
    /// Members discarded because the topology had no place for them
    pub dropped: Vec<String>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.skipped_lines.is_empty() && self.orphaned.is_empty() && self.dropped.is_empty()
    }
}

struct Record {
    line: usize,
    member: Member,
    sponsor_id: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PersistenceCodec {
    topology: Topology,
}

impl PersistenceCodec {
    pub fn new(topology: Topology) -> Self {
        Self { topology }
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn serialize(&self, hierarchy: &Hierarchy) -> String {
        let mut out = String::with_capacity(64 * (hierarchy.len() + 1));
        out.push_str(HEADER);
        out.push('\n');
        for (_, member) in hierarchy.iter() {
            let sponsor = hierarchy
                .sponsor_of(member.id())
                .map(|s| sanitize(s.id()))
                .unwrap_or_default();
            out.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
                sanitize(member.id()),
                sanitize(member.name()),
                sponsor,
                member.own_sales(),
                member.commission_rate(),
                member.status(),
                sanitize(member.phone()),
                member.balance(),
            ));
        }
        out
    }

    pub fn deserialize(&self, text: &str) -> Hierarchy {
        self.deserialize_with_report(text).0
    }

    /// Rebuild a hierarchy in two passes: create every member, then link
    /// sponsors in file order so forward references resolve.
    #[instrument(level = "debug", skip(self, text))]
    pub fn deserialize_with_report(&self, text: &str) -> (Hierarchy, LoadReport) {
        let mut report = LoadReport::default();
        let mut hierarchy = Hierarchy::new(self.topology);

        let mut pending: Vec<(Index, String)> = Vec::new();
        for record in parse_records(text, &mut report) {
            if hierarchy.contains(record.member.id()) {
                warn!(
                    "line {}: duplicate member id {}, row skipped",
                    record.line,
                    record.member.id()
                );
                report.skipped_lines.push(record.line);
                continue;
            }
            let idx = hierarchy.insert_detached(record.member);
            pending.push((idx, record.sponsor_id));
        }

        for (idx, sponsor_id) in pending {
            self.place(&mut hierarchy, idx, &sponsor_id, &mut report);
        }

        match self.topology {
            Topology::Binary => prune_outside_root(&mut hierarchy, &mut report),
            Topology::Unbounded => {
                if hierarchy.root_index().is_none() {
                    let first = hierarchy.top_level_indices().next();
                    if let Some(first) = first {
                        hierarchy.set_root(first);
                    }
                }
            }
        }
        debug!(
            "loaded {} members ({} skipped rows, {} orphaned, {} dropped)",
            hierarchy.len(),
            report.skipped_lines.len(),
            report.orphaned.len(),
            report.dropped.len()
        );
        (hierarchy, report)
    }

    fn place(
        &self,
        hierarchy: &mut Hierarchy,
        idx: Index,
        sponsor_id: &str,
        report: &mut LoadReport,
    ) {
        let id = hierarchy
            .get(idx)
            .map(|m| m.id().to_string())
            .unwrap_or_default();

        if sponsor_id.is_empty() {
            if hierarchy.root_index().is_none() {
                hierarchy.set_root(idx);
            } else if self.topology == Topology::Binary {
                warn!("member {} is a second root, dropped", id);
            }
            return;
        }

        let linked = match hierarchy.index_of(sponsor_id) {
            Some(sponsor) => hierarchy.link(idx, sponsor).map_err(|e| e.to_string()),
            None => Err(format!("sponsor {} not found", sponsor_id)),
        };
        if let Err(reason) = linked {
            match self.topology {
                Topology::Unbounded => {
                    warn!("member {}: {}, kept as top-level", id, reason);
                    report.orphaned.push(id);
                }
                Topology::Binary => warn!("member {}: {}, dropped", id, reason),
            }
        }
    }
}

fn parse_records(text: &str, report: &mut LoadReport) -> Vec<Record> {
    let mut records = Vec::new();
    for (n, raw) in text.lines().enumerate() {
        let line = n + 1;
        let raw = raw.trim_end_matches('\r');
        if raw.trim().is_empty() || raw == HEADER {
            continue;
        }
        match parse_row(raw) {
            Ok((member, sponsor_id)) => records.push(Record {
                line,
                member,
                sponsor_id,
            }),
            Err(reason) => {
                warn!("line {}: {}, row skipped", line, reason);
                report.skipped_lines.push(line);
            }
        }
    }
    records
}

fn parse_row(raw: &str) -> Result<(Member, String), String> {
    let fields: Vec<&str> = raw.split('\t').collect();
    if fields.len() < FIELD_COUNT {
        return Err(format!(
            "expected {} fields, found {}",
            FIELD_COUNT,
            fields.len()
        ));
    }
    let id = fields[0].trim();
    if id.is_empty() {
        return Err("empty member id".to_string());
    }

    let own_sales = parse_amount(fields[3], "ownSales")?;
    let rate = parse_amount(fields[4], "commissionRate")?;
    let status = match fields[5].trim() {
        "" => MemberStatus::default(),
        s => s.parse::<MemberStatus>()?,
    };
    let balance = parse_amount(fields[7], "balance")?;

    let mut member = Member::new(id.to_string(), fields[1].to_string());
    member.add_own_sales(own_sales);
    member.set_commission_rate(rate);
    member.set_status(status);
    member.set_phone(fields[6]);
    member.credit(balance);
    Ok((member, fields[2].trim().to_string()))
}

fn parse_amount(field: &str, column: &str) -> Result<f64, String> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(0.0);
    }
    field
        .parse::<f64>()
        .map_err(|e| format!("invalid {} '{}': {}", column, field, e))
}

/// Binary files keep a single tree: everything outside the root's goes.
fn prune_outside_root(hierarchy: &mut Hierarchy, report: &mut LoadReport) {
    let kept: HashSet<Index> = match hierarchy.root_index() {
        Some(root) => hierarchy.iter_subtree(root).map(|(idx, _)| idx).collect(),
        None => HashSet::new(),
    };
    let doomed: Vec<Index> = hierarchy
        .iter_indexed_members()
        .filter(|(idx, _)| !kept.contains(idx))
        .map(|(idx, member)| {
            report.dropped.push(member.id().to_string());
            idx
        })
        .collect();
    if !doomed.is_empty() {
        warn!("{} members outside the root's tree dropped", doomed.len());
        hierarchy.prune(&doomed);
    }
}

fn sanitize(field: &str) -> String {
    field.replace(['\t', '\n', '\r'], " ")
}
