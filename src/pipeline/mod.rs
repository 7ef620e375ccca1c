pub mod emit;
pub mod ingestion;
pub mod processing;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::error::Result;
use crate::metrics::{GroupMetrics, RuleMetrics};
use crate::storage::{Artifact, OutputSink};
use crate::types::{GroupRecord, RemoteRuleRecord, RuleInputRecord};
use emit::{BlockEmitter, DuplicateImport, ImportEmitter};
use processing::derive::{OrdinalCounter, RuleDeriver};
use processing::matcher::Matcher;
use processing::normalize::{normalize_group_name, NormalizedGroup};

/// Result of a group pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct GroupPipelineResult {
    pub total_rows: usize,
    pub blocks_generated: usize,
    pub excluded_rows: usize,
}

/// Rendered output of the group pipeline
#[derive(Debug, Clone)]
pub struct GroupRunOutput {
    pub blocks: String,
    pub result: GroupPipelineResult,
}

/// Result of a rule pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RulePipelineResult {
    pub total_rows: usize,
    pub blocks_generated: usize,
    pub imports_generated: usize,
    pub distinct_remote_identifiers: usize,
    pub excluded_rows: usize,
    /// Identifiers of derived rules no remote record matched
    pub unmatched: Vec<String>,
    pub duplicates: Vec<DuplicateImport>,
}

/// Rendered output of the rule pipeline
#[derive(Debug, Clone)]
pub struct RuleRunOutput {
    pub blocks: String,
    pub script: String,
    pub result: RulePipelineResult,
}

/// JSON report written next to the rule outputs on request
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub result: RulePipelineResult,
}

/// File locations for one rule pipeline run
#[derive(Debug, Clone)]
pub struct RulePaths {
    pub input: PathBuf,
    pub remote: PathBuf,
    pub output: PathBuf,
    pub script: PathBuf,
    pub report: Option<PathBuf>,
}

pub struct Pipeline {
    config: Config,
    emitter: BlockEmitter,
    deriver: RuleDeriver,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        let emitter = BlockEmitter::new(config.resource_types.clone());
        let deriver = RuleDeriver::new(config.all_traffic_cidr.clone());
        Self {
            config,
            emitter,
            deriver,
        }
    }

    /// Render one block per group row, in input order
    ///
    /// Any malformed row fails the whole batch.
    #[instrument(skip_all, fields(rows = records.len()))]
    pub fn generate_groups(&self, records: &[GroupRecord]) -> Result<GroupRunOutput> {
        GroupMetrics::record_rows_read(records.len());
        let mut blocks = Vec::with_capacity(records.len());
        let mut excluded_rows = 0;

        for (index, record) in records.iter().enumerate() {
            let group = NormalizedGroup::from_record(record, index + 1)?;
            if self.config.is_excluded(&group.name) {
                debug!("Skipping excluded group {}", group.name);
                GroupMetrics::record_group_excluded();
                excluded_rows += 1;
                continue;
            }
            blocks.push(self.emitter.render_group(&group)?);
            GroupMetrics::record_group_emitted();
        }

        info!("✅ Generated {} group blocks ({} excluded)", blocks.len(), excluded_rows);
        Ok(GroupRunOutput {
            result: GroupPipelineResult {
                total_rows: records.len(),
                blocks_generated: blocks.len(),
                excluded_rows,
            },
            blocks: blocks.join("\n"),
        })
    }

    /// Derive, render and match every rule row, in input order
    ///
    /// Unmatched rules are logged and listed in the result; they still get a
    /// block, only their import directive is missing.
    #[instrument(skip_all, fields(rows = records.len(), remote = remote.len()))]
    pub fn generate_rules(
        &self,
        records: &[RuleInputRecord],
        remote: &[RemoteRuleRecord],
    ) -> Result<RuleRunOutput> {
        RuleMetrics::record_rows_read(records.len());
        let mut counter = OrdinalCounter::new();
        let mut imports = ImportEmitter::new(self.config.import.clone());
        let mut blocks = Vec::with_capacity(records.len());
        let mut unmatched = Vec::new();
        let mut excluded_rows = 0;

        for (index, record) in records.iter().enumerate() {
            let row = index + 1;
            let group_name = normalize_group_name(&record.group_name).map_err(|e| e.at_row(row))?;
            if self.config.is_excluded(&group_name) {
                debug!("Skipping row {} of excluded group {}", row, group_name);
                RuleMetrics::record_rule_excluded();
                excluded_rows += 1;
                continue;
            }

            let rule = self.deriver.derive(record, &group_name, row, &mut counter)?;
            RuleMetrics::record_rule_derived();
            if rule.protocol.is_none() {
                // declared as all protocols in the block, but nothing remote can match it
                debug!("{} has no protocol and will not be imported", rule.identifier);
            }
            blocks.push(self.emitter.render_rule(&rule)?);

            match Matcher::find(&rule, remote) {
                Some(found) => {
                    let resource_type = self.emitter.resource_types().for_direction(rule.direction);
                    imports.push(resource_type, &rule.identifier, &found.security_group_rule_id);
                    RuleMetrics::record_match(true);
                }
                None => {
                    warn!("No matching remote rule found for {}", rule.identifier);
                    RuleMetrics::record_match(false);
                    unmatched.push(rule.identifier);
                }
            }
        }

        let duplicates = imports.duplicates();
        for duplicate in &duplicates {
            warn!(
                "Remote rule {} is imported {} times: {}",
                duplicate.remote_identifier,
                duplicate.count,
                duplicate.addresses.join(", ")
            );
        }
        RuleMetrics::record_duplicate_imports(duplicates.len());

        info!(
            "✅ Generated {} rule blocks, {} import commands ({} unmatched, {} excluded)",
            blocks.len(),
            imports.len(),
            unmatched.len(),
            excluded_rows
        );

        Ok(RuleRunOutput {
            script: imports.render(),
            result: RulePipelineResult {
                total_rows: records.len(),
                blocks_generated: blocks.len(),
                imports_generated: imports.len(),
                distinct_remote_identifiers: imports.distinct_remote_identifiers(),
                excluded_rows,
                unmatched,
                duplicates,
            },
            blocks: blocks.join("\n"),
        })
    }

    /// Group pipeline from a CSV file to a block file
    pub fn run_groups(&self, input: &Path, output: &Path, sink: &mut dyn OutputSink) -> Result<GroupPipelineResult> {
        info!("🚀 Starting group pipeline for {}", input.display());
        let records = ingestion::read_group_records_from_path(input)?;
        let run = self.generate_groups(&records)?;

        sink.write_all(&[Artifact::new(output, run.blocks)])?;
        info!("💾 Wrote group blocks to {}", output.display());
        Ok(run.result)
    }

    /// Rule pipeline from CSV rows and the remote listing to blocks and script
    ///
    /// The remote listing is loaded first so an unusable listing aborts the
    /// run before anything is derived or written.
    pub fn run_rules(&self, paths: &RulePaths, sink: &mut dyn OutputSink) -> Result<RulePipelineResult> {
        info!("🚀 Starting rule pipeline for {}", paths.input.display());
        let remote = ingestion::load_remote_listing_from_path(&paths.remote)?;
        RuleMetrics::record_remote_rules_loaded(remote.len());
        let records = ingestion::read_rule_records_from_path(&paths.input)?;

        let run = self.generate_rules(&records, &remote)?;

        let mut artifacts = vec![
            Artifact::new(&paths.output, run.blocks),
            Artifact::new(&paths.script, run.script),
        ];
        if let Some(report) = &paths.report {
            let summary = RunSummary {
                generated_at: Utc::now(),
                result: run.result.clone(),
            };
            artifacts.push(Artifact::new(report, serde_json::to_string_pretty(&summary)?));
        }

        sink.write_all(&artifacts)?;
        info!(
            "💾 Wrote rule blocks to {} and import script to {}",
            paths.output.display(),
            paths.script.display()
        );
        Ok(run.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(group: &str, direction: &str, ranges: &str) -> RuleInputRecord {
        RuleInputRecord {
            group_name: group.to_string(),
            group_id: "sg-1".to_string(),
            direction: direction.to_string(),
            ip_ranges: Some(ranges.to_string()),
            ..Default::default()
        }
    }

    fn all_traffic_egress(id: &str) -> RemoteRuleRecord {
        RemoteRuleRecord {
            security_group_rule_id: id.to_string(),
            group_id: "sg-1".to_string(),
            is_egress: true,
            ip_protocol: Some("-1".to_string()),
            from_port: Some(-1),
            to_port: Some(-1),
            cidr_ipv4: Some("0.0.0.0/0".to_string()),
            prefix_list_id: None,
            referenced_group_info: None,
            description: None,
        }
    }

    #[test]
    fn test_excluded_group_produces_nothing() {
        let mut config = Config::default();
        config.excluded_groups = vec!["eks-cluster".to_string()];
        let pipeline = Pipeline::new(config);

        let records = vec![row("EKS Cluster", "Outbound", "0.0.0.0/0")];
        let run = pipeline
            .generate_rules(&records, &[all_traffic_egress("sgr-1")])
            .unwrap();

        assert_eq!(run.result.blocks_generated, 0);
        assert_eq!(run.result.imports_generated, 0);
        assert_eq!(run.result.excluded_rows, 1);
        assert!(run.blocks.is_empty());
        assert_eq!(run.script, "@echo off\npause\n");
    }

    #[test]
    fn test_unmatched_rule_still_gets_a_block() {
        let pipeline = Pipeline::new(Config::default());
        let records = vec![
            row("web", "Outbound", "0.0.0.0/0"),
            row("web", "Outbound", "10.0.0.0/8 (internal)"),
        ];

        let run = pipeline
            .generate_rules(&records, &[all_traffic_egress("sgr-1")])
            .unwrap();

        assert_eq!(run.result.blocks_generated, 2);
        assert_eq!(run.result.imports_generated, 1);
        assert_eq!(run.result.unmatched, vec!["web-egress2".to_string()]);
        assert!(run.script.contains("aws_vpc_security_group_egress_rule.web-egress1 sgr-1"));
        assert!(run.blocks.contains("\"web-egress2\""));
    }

    #[test]
    fn test_protocol_less_rule_is_never_imported() {
        let pipeline = Pipeline::new(Config::default());
        // port-less egress to a CIDR other than the all-traffic one
        let records = vec![row("web", "Outbound", "10.0.0.0/8")];
        let mut remote = all_traffic_egress("sgr-1");
        remote.cidr_ipv4 = Some("10.0.0.0/8".to_string());

        let run = pipeline.generate_rules(&records, &[remote]).unwrap();

        assert!(run.blocks.contains("  ip_protocol       = -1\n"));
        assert_eq!(run.result.imports_generated, 0);
        assert_eq!(run.result.unmatched, vec!["web-egress1".to_string()]);
    }

    #[test]
    fn test_group_names_normalize_to_one_ordinal_sequence() {
        let pipeline = Pipeline::new(Config::default());
        let records = vec![
            row("Web Servers", "Outbound", "0.0.0.0/0"),
            row("EKS", "Outbound", "0.0.0.0/0"),
            row(" web servers ", "Outbound", "10.0.0.0/8"),
        ];
        let mut config = Config::default();
        config.excluded_groups = vec!["eks".to_string()];
        let excluding = Pipeline::new(config);

        let run = pipeline.generate_rules(&records, &[]).unwrap();
        assert!(run.blocks.contains("\"web-servers-egress2\""));
        assert!(run.blocks.contains("\"eks-egress1\""));

        let run = excluding.generate_rules(&records, &[]).unwrap();
        assert_eq!(run.result.excluded_rows, 1);
        assert_eq!(
            run.result.unmatched,
            vec!["web-servers-egress1".to_string(), "web-servers-egress2".to_string()]
        );
    }

    #[test]
    fn test_duplicate_remote_ids_are_reported() {
        let pipeline = Pipeline::new(Config::default());
        let records = vec![row("web", "Outbound", "0.0.0.0/0"), row("web", "egress", "0.0.0.0/0")];

        let run = pipeline
            .generate_rules(&records, &[all_traffic_egress("sgr-1")])
            .unwrap();

        assert_eq!(run.result.imports_generated, 2);
        assert_eq!(run.result.distinct_remote_identifiers, 1);
        assert_eq!(run.result.duplicates.len(), 1);
        assert_eq!(run.result.duplicates[0].count, 2);
    }

    #[test]
    fn test_blocks_are_separated_by_blank_line() {
        let pipeline = Pipeline::new(Config::default());
        let records = vec![
            GroupRecord {
                group_name: "a".to_string(),
                vpc_id: Some("vpc-1".to_string()),
                description: None,
                tags: None,
            },
            GroupRecord {
                group_name: "b".to_string(),
                vpc_id: Some("vpc-1".to_string()),
                description: None,
                tags: None,
            },
        ];

        let run = pipeline.generate_groups(&records).unwrap();
        assert_eq!(run.result.blocks_generated, 2);
        assert!(run.blocks.contains("}\n\nresource \"aws_security_group\" \"b\""));
    }

    #[test]
    fn test_malformed_tag_fails_group_batch() {
        let pipeline = Pipeline::new(Config::default());
        let records = vec![GroupRecord {
            group_name: "a".to_string(),
            vpc_id: None,
            description: None,
            tags: Some("no-colon".to_string()),
        }];
        assert!(pipeline.generate_groups(&records).is_err());
    }
}
