//! grouptree-admin library - command definitions and execution
//!
//! Every subcommand maps onto one `grouptree_common` operation and renders
//! its result as text (or JSON where `--json` is given).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use grouptree_common::access::{create_view_level, list_view_levels};
use grouptree_common::membership::{add_member, groups_for_user, members_of, remove_member};
use grouptree_common::tree::{
    ancestors, delete_group, descendants, load_group, outline, rebuild_from, save_group,
    verify_tree,
};
use grouptree_common::{GroupDraft, RuleSet, UserGroup};
use sqlx::SqlitePool;
use std::fmt::Write;
use std::path::PathBuf;
use tracing::debug;

/// Command-line arguments for grouptree-admin
#[derive(Parser, Debug)]
#[command(name = "grouptree-admin")]
#[command(about = "Maintain a nested-set usergroup hierarchy")]
#[command(version)]
pub struct Args {
    /// SQLite database file
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database and seed the root group
    Init,
    /// Show the tree
    List {
        #[arg(long)]
        json: bool,
    },
    /// Add a group below a parent
    Add {
        #[arg(long)]
        parent: i64,
        #[arg(long)]
        title: String,
    },
    /// Rename or move a group
    Update {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        parent: Option<i64>,
        #[arg(long)]
        title: Option<String>,
    },
    /// Delete a group and its descendants
    Delete {
        #[arg(long)]
        id: i64,
    },
    /// Recompute lft/rgt
    Rebuild {
        /// Start at this group instead of the root
        #[arg(long)]
        from: Option<i64>,
        #[arg(long, default_value_t = 0)]
        left: i64,
    },
    /// Report nested-set invariant violations
    Verify,
    Ancestors {
        #[arg(long)]
        id: i64,
    },
    Descendants {
        #[arg(long)]
        id: i64,
    },
    /// Manage view levels
    #[command(subcommand)]
    ViewLevel(ViewLevelCommand),
    /// Manage user memberships
    #[command(subcommand)]
    Member(MemberCommand),
}

#[derive(Subcommand, Debug)]
pub enum ViewLevelCommand {
    Add {
        #[arg(long)]
        title: String,
        /// Group ids, e.g. 1,6,7
        #[arg(long, value_delimiter = ',')]
        groups: Vec<i64>,
    },
    List,
}

#[derive(Subcommand, Debug)]
pub enum MemberCommand {
    Add {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        group: i64,
    },
    Remove {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        group: i64,
    },
    /// Groups of a user, or users of a group
    List {
        #[arg(long, conflicts_with = "group", required_unless_present = "group")]
        user: Option<i64>,
        #[arg(long)]
        group: Option<i64>,
    },
}

/// Run one command and return what should be printed
pub async fn execute(pool: &SqlitePool, command: Command) -> Result<String> {
    let mut out = String::new();

    match command {
        Command::Init => {
            let root = grouptree_common::tree::root_group(pool).await?;
            writeln!(out, "Database ready, root group {} '{}'", root.id, root.title)?;
        }
        Command::List { json } => {
            let entries = outline(pool).await?;
            if json {
                out = serde_json::to_string_pretty(&entries)?;
                out.push('\n');
            } else {
                for entry in entries {
                    writeln!(out, "{}{}", "  ".repeat(entry.depth), describe(&entry.group))?;
                }
            }
        }
        Command::Add { parent, title } => {
            let group = save_group(pool, &GroupDraft::new(parent, title)).await?;
            writeln!(out, "Added {}", describe(&group))?;
        }
        Command::Update { id, parent, title } => {
            let current = load_group(pool, id)
                .await?
                .with_context(|| format!("Usergroup {} not found", id))?;
            let draft = GroupDraft::existing(
                id,
                parent.unwrap_or(current.parent_id),
                title.unwrap_or(current.title),
            );
            let group = save_group(pool, &draft).await?;
            writeln!(out, "Updated {}", describe(&group))?;
        }
        Command::Delete { id } => {
            let ids = delete_group(pool, id).await?;
            writeln!(out, "Deleted {} group(s): {:?}", ids.len(), ids)?;
        }
        Command::Rebuild { from, left } => {
            let next = rebuild_from(pool, from, left).await?;
            writeln!(out, "Rebuilt tree, next left boundary {}", next)?;
        }
        Command::Verify => {
            let violations = verify_tree(pool).await?;
            if violations.is_empty() {
                writeln!(out, "Tree is consistent")?;
            } else {
                for violation in &violations {
                    writeln!(out, "{}", violation)?;
                }
                anyhow::bail!("{} violation(s):\n{}", violations.len(), out.trim_end());
            }
        }
        Command::Ancestors { id } => {
            for group in ancestors(pool, id, false).await? {
                writeln!(out, "{}", describe(&group))?;
            }
        }
        Command::Descendants { id } => {
            for group in descendants(pool, id, false).await? {
                writeln!(out, "{}", describe(&group))?;
            }
        }
        Command::ViewLevel(ViewLevelCommand::Add { title, groups }) => {
            let level = create_view_level(pool, &title, &RuleSet::new(groups)).await?;
            writeln!(out, "Added view level {} '{}' {}", level.id, level.title, level.rules)?;
        }
        Command::ViewLevel(ViewLevelCommand::List) => {
            for level in list_view_levels(pool).await? {
                writeln!(out, "{} '{}' {}", level.id, level.title, level.rules)?;
            }
        }
        Command::Member(MemberCommand::Add { user, group }) => {
            add_member(pool, user, group).await?;
            writeln!(out, "User {} added to group {}", user, group)?;
        }
        Command::Member(MemberCommand::Remove { user, group }) => {
            if remove_member(pool, user, group).await? {
                writeln!(out, "User {} removed from group {}", user, group)?;
            } else {
                writeln!(out, "User {} was not in group {}", user, group)?;
            }
        }
        Command::Member(MemberCommand::List { user, group }) => {
            let ids = match (user, group) {
                (Some(user), _) => groups_for_user(pool, user).await?,
                (None, Some(group)) => members_of(pool, group).await?,
                (None, None) => anyhow::bail!("--user or --group is required"),
            };
            writeln!(out, "{:?}", ids)?;
        }
    }

    debug!("Command finished");
    Ok(out)
}

fn describe(group: &UserGroup) -> String {
    format!("[{}] {} ({}..{})", group.id, group.title, group.lft, group.rgt)
}
