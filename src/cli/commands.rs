//! Command dispatch
//!
//! Every data command loads the member file, runs one operation and, when
//! the hierarchy changed, writes it back.

use std::io;
use std::path::PathBuf;

use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::services::{LoadReport, Payout, SaleOutcome};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{DomainError, Hierarchy, Member};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;
use crate::tree_traits::TreeNodeConvert;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, run with --help".to_string(),
        ));
    };

    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Commands::Config { command } => cmd_config(cli, command),
        _ => {
            let container = build_container(cli)?;
            run_data_command(&container, command)
        }
    }
}

fn project_dir(cli: &Cli) -> CliResult<PathBuf> {
    match &cli.project_dir {
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir()
            .map_err(|e| InfraError::io("resolve current directory", e).into()),
    }
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let dir = project_dir(cli)?;
    let mut settings = Settings::load(Some(&dir))?;
    if let Some(data_file) = &cli.data_file {
        settings.data_file = data_file.clone();
    }
    if let Some(topology) = cli.topology {
        settings.topology = topology;
    }
    Ok(settings)
}

fn build_container(cli: &Cli) -> CliResult<ServiceContainer> {
    let settings = load_settings(cli)?;
    debug!(
        "data_file={} topology={}",
        settings.data_file.display(),
        settings.topology
    );
    Ok(ServiceContainer::new(settings))
}

fn load(container: &ServiceContainer) -> CliResult<Hierarchy> {
    let (hierarchy, report) = container.store.load(&container.settings.data_file)?;
    report_load_issues(&report);
    Ok(hierarchy)
}

fn save(container: &ServiceContainer, hierarchy: &Hierarchy) -> CliResult<()> {
    container
        .store
        .save(&container.settings.data_file, hierarchy)?;
    Ok(())
}

fn report_load_issues(report: &LoadReport) {
    if report.is_clean() {
        return;
    }
    if !report.skipped_lines.is_empty() {
        output::warning(&format!(
            "skipped malformed lines: {}",
            report.skipped_lines.iter().join(", ")
        ));
    }
    if !report.orphaned.is_empty() {
        output::warning(&format!(
            "sponsor missing, kept as top-level: {}",
            report.orphaned.join(", ")
        ));
    }
    if !report.dropped.is_empty() {
        output::warning(&format!(
            "dropped (no place in binary tree): {}",
            report.dropped.join(", ")
        ));
    }
}

#[instrument(level = "debug", skip(container))]
fn run_data_command(container: &ServiceContainer, command: &Commands) -> CliResult<()> {
    let mut hierarchy = load(container)?;

    let changed = match command {
        Commands::Add {
            name,
            id,
            sponsor,
            rate,
            phone,
        } => {
            cmd_add(
                &mut hierarchy,
                name,
                id.as_deref(),
                sponsor.as_deref(),
                *rate,
                phone.as_deref(),
            )?;
            true
        }
        Commands::Sale {
            seller,
            amount,
            weights,
        } => cmd_sale(container, &mut hierarchy, seller, *amount, weights.as_deref())?,
        Commands::Distribute {
            seller,
            amount,
            percentages,
        } => {
            cmd_distribute(container, &mut hierarchy, seller, *amount, percentages.as_deref())?;
            true
        }
        Commands::Show { id } => {
            cmd_show(&hierarchy, id)?;
            false
        }
        Commands::Tree { id } => {
            cmd_tree(&hierarchy, id.as_deref())?;
            false
        }
        Commands::Rank { limit } => {
            cmd_rank(container, &hierarchy, *limit);
            false
        }
        Commands::Uplines { id } => {
            let member = require(&hierarchy, id)?;
            output::header(&format!("Uplines of {}", member));
            list_members(hierarchy.uplines(id));
            false
        }
        Commands::Downlines { id } => {
            let member = require(&hierarchy, id)?;
            output::header(&format!("Downlines of {}", member));
            list_members(hierarchy.all_downlines(id));
            false
        }
        Commands::Roots => {
            output::header("Top-level members");
            list_members(hierarchy.top_level_members());
            false
        }
        Commands::Balances { breadth_first } => {
            let members: Vec<&Member> = if *breadth_first {
                hierarchy.breadth_first()
            } else {
                hierarchy.members().collect()
            };
            output::header(&format!("{} members", members.len()));
            list_members(members);
            false
        }
        Commands::Reparent { member, sponsor } => {
            hierarchy.reparent(member, sponsor)?;
            output::success(&format!("{} now sponsored by {}", member, sponsor));
            true
        }
        Commands::InsertParent { child, name } => {
            let inserted = hierarchy.insert_parent(child, name)?;
            output::success(&format!("inserted {} above {}", inserted, child));
            true
        }
        Commands::Update {
            id,
            rate,
            phone,
            status,
        } => {
            let member = hierarchy
                .find_mut(id)
                .ok_or_else(|| DomainError::MemberNotFound(id.clone()))?;
            if let Some(rate) = rate {
                member.set_commission_rate(*rate);
            }
            if let Some(phone) = phone {
                member.set_phone(phone.as_str());
            }
            if let Some(status) = status {
                member.set_status(*status);
            }
            output::success(&format!("updated {}", member));
            true
        }
        Commands::Config { .. } | Commands::Completion { .. } => {
            return Err(CliError::Usage("not a data command".to_string()))
        }
    };

    if changed {
        save(container, &hierarchy)?;
    }
    Ok(())
}

fn require<'a>(hierarchy: &'a Hierarchy, id: &str) -> CliResult<&'a Member> {
    hierarchy
        .find(id)
        .ok_or_else(|| DomainError::MemberNotFound(id.to_string()).into())
}

fn list_members<'a>(members: impl IntoIterator<Item = &'a Member>) {
    let mut any = false;
    for member in members {
        output::detail(member);
        any = true;
    }
    if !any {
        output::detail("(none)");
    }
}

fn cmd_add(
    hierarchy: &mut Hierarchy,
    name: &str,
    id: Option<&str>,
    sponsor: Option<&str>,
    rate: Option<f64>,
    phone: Option<&str>,
) -> CliResult<()> {
    let member = hierarchy.attach(id, name, sponsor)?;
    if let Some(rate) = rate {
        member.set_commission_rate(rate);
    }
    if let Some(phone) = phone {
        member.set_phone(phone);
    }
    let added_id = member.id().to_string();
    let added = member.to_string();
    match hierarchy.sponsor_of(&added_id) {
        Some(s) => output::success(&format!("added {} under {}", added, s.name())),
        None => output::success(&format!("added {} as root", added)),
    }
    Ok(())
}

fn cmd_sale(
    container: &ServiceContainer,
    hierarchy: &mut Hierarchy,
    seller: &str,
    amount: f64,
    weights: Option<&[f64]>,
) -> CliResult<bool> {
    let outcome = match weights {
        Some(weights) => container
            .commission
            .record_sale_with_percentages(hierarchy, seller, amount, weights)?,
        None => container.commission.record_sale(hierarchy, seller, amount)?,
    };

    match outcome {
        SaleOutcome::SellerNotActive { seller_id, status } => {
            output::warning(&format!(
                "{} is {}, sale not recorded",
                seller_id, status
            ));
            Ok(false)
        }
        SaleOutcome::Recorded(receipt) => {
            output::success(&format!(
                "sale of {:.2} by {} recorded",
                receipt.amount, receipt.seller_id
            ));
            output::detail(&format!("own commission: {:.2}", receipt.self_commission));
            if receipt.payouts.is_empty() {
                output::detail(&format!("no upline, pool of {:.2} kept", receipt.pool));
            } else {
                print_payouts(&receipt.payouts);
                output::detail(&format!(
                    "distributed {:.2} of pool {:.2}",
                    receipt.distributed(),
                    receipt.pool
                ));
            }
            Ok(true)
        }
    }
}

fn cmd_distribute(
    container: &ServiceContainer,
    hierarchy: &mut Hierarchy,
    seller: &str,
    amount: f64,
    percentages: Option<&[f64]>,
) -> CliResult<()> {
    let percentages =
        percentages.unwrap_or(container.settings.commission.default_percentages.as_slice());
    let payouts = container
        .commission
        .distribute_by_position(hierarchy, seller, amount, percentages)?;
    output::success(&format!(
        "distributed {:.2} of {:.2} from {}",
        payouts.iter().map(|p| p.amount).sum::<f64>(),
        amount,
        seller
    ));
    print_payouts(&payouts);
    Ok(())
}

fn print_payouts(payouts: &[Payout]) {
    for p in payouts {
        output::success_detail(&format!(
            "level {} {} ({}): {:.2} ({:.2}%)",
            p.level,
            p.name,
            p.member_id,
            p.amount,
            p.share * 100.0
        ));
    }
}

fn cmd_show(hierarchy: &Hierarchy, id: &str) -> CliResult<()> {
    let member = require(hierarchy, id)?;
    output::header(member);
    output::action("status", &member.status());
    output::action("sponsor", &name_or_dash(hierarchy.sponsor_of(id)));
    output::action("level", &hierarchy.level(id).unwrap_or_default());
    output::action(
        "rate",
        &format!("{:.2}%", member.commission_rate() * 100.0),
    );
    output::action("phone", &member.phone());
    output::action("own sales", &format!("{:.2}", member.own_sales()));
    output::action(
        "sales volume",
        &format!("{:.2}", hierarchy.sales_volume(id).unwrap_or_default()),
    );
    output::action(
        "siblings",
        &format!(
            "{} < > {}",
            name_or_dash(hierarchy.previous_sibling_of(id)),
            name_or_dash(hierarchy.next_sibling_of(id))
        ),
    );
    let children = hierarchy.children_of(id);
    output::action("direct recruits", &children.len());
    for child in children {
        output::detail(child);
    }
    Ok(())
}

fn name_or_dash(member: Option<&Member>) -> String {
    member
        .map(|m| format!("{} ({})", m.name(), m.id()))
        .unwrap_or_else(|| "-".to_string())
}

fn cmd_tree(hierarchy: &Hierarchy, id: Option<&str>) -> CliResult<()> {
    match id {
        Some(id) => {
            let tree = hierarchy
                .subtree_to_tree_string(id)
                .ok_or_else(|| DomainError::MemberNotFound(id.to_string()))?;
            output::info(&tree);
        }
        None if hierarchy.is_empty() => output::detail("(empty)"),
        None => {
            for tree in hierarchy.to_tree_strings() {
                output::info(&tree);
            }
            output::detail(&format!(
                "{} members, depth {}",
                hierarchy.len(),
                hierarchy.depth()
            ));
        }
    }
    Ok(())
}

fn cmd_rank(container: &ServiceContainer, hierarchy: &Hierarchy, limit: Option<usize>) {
    let ranked = container.ranking.sort_by_sales_volume(hierarchy);
    output::header("Rank by sales volume");
    let shown = limit.unwrap_or(ranked.len());
    for (pos, entry) in ranked.iter().take(shown).enumerate() {
        output::detail(&format!(
            "{:>3}. {:<24} {:>12.2}",
            pos + 1,
            format!("{} ({})", entry.member.name(), entry.member.id()),
            entry.sales_volume
        ));
    }
}

fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            let global = global_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(unavailable)".to_string());
            let local = local_config_path(&project_dir(cli)?);
            output::action("global", &global);
            output::action("local", &local.display());
        }
    }
    Ok(())
}
