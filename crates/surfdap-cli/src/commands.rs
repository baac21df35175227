//! Subcommand arguments and handlers.

use clap::Args;
use std::fmt::Write;
use surfdap::{
    format_json, format_results, AttributeSelection, DirectoryEntry, Node, SearchLimits,
    SearchScope, MATCH_ALL_FILTER,
};
use tracing::{debug, info};

/// Arguments for `search`
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Search scope: base, one or sub
    #[arg(short, long, default_value = "base")]
    pub scope: SearchScope,

    /// Search filter
    #[arg(short, long, default_value = MATCH_ALL_FILTER)]
    pub filter: String,

    /// Comma-separated attributes to return; `*` for all
    #[arg(short, long, default_value = "*")]
    pub attrs: AttributeSelection,

    /// Maximum number of entries (0 for no limit)
    #[arg(long, value_parser = clap::value_parser!(i32).range(0..))]
    pub size_limit: Option<i32>,

    /// Maximum search time in seconds (0 for no limit)
    #[arg(long, value_parser = clap::value_parser!(i32).range(0..))]
    pub time_limit: Option<i32>,

    /// Print entries as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchArgs {
    /// Applies the limit flags on top of the configured limits.
    pub fn limits(&self, configured: SearchLimits) -> SearchLimits {
        let mut limits = configured;
        if let Some(size_limit) = self.size_limit {
            limits = limits.with_size_limit(size_limit);
        }
        if let Some(time_limit) = self.time_limit {
            limits = limits.with_time_limit(time_limit);
        }
        limits
    }
}

/// Arguments for `children`
#[derive(Debug, Args)]
pub struct ChildrenArgs {
    /// Search filter
    #[arg(short, long, default_value = MATCH_ALL_FILTER)]
    pub filter: String,

    /// Comma-separated attributes to print with each child; DNs only when omitted
    #[arg(short, long)]
    pub attrs: Option<AttributeSelection>,

    /// Print entries as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `tree`
#[derive(Debug, Args)]
pub struct TreeArgs {
    /// How many levels below the base DN to walk
    #[arg(short, long, default_value_t = 1)]
    pub depth: usize,

    /// Filter applied at every level
    #[arg(short, long, default_value = MATCH_ALL_FILTER)]
    pub filter: String,
}

pub async fn search(root: &Node, args: SearchArgs) -> anyhow::Result<()> {
    let nodes = root
        .search_cached(args.scope, &args.filter, args.attrs)
        .await?;
    info!(scope = %args.scope, results = nodes.len(), "search complete");

    let entries: Vec<DirectoryEntry> = nodes.iter().map(|node| node.entry().clone()).collect();
    print_entries(args.scope, &entries, args.json)
}

pub async fn children(root: &Node, args: ChildrenArgs) -> anyhow::Result<()> {
    match args.attrs {
        None => {
            for child in root
                .children(&args.filter, AttributeSelection::IdentityOnly)
                .await?
            {
                println!("{}", child.dn());
            }
            Ok(())
        }
        Some(attrs) => {
            let entries: Vec<DirectoryEntry> = root
                .search_cached(SearchScope::OneLevel, &args.filter, attrs)
                .await?
                .into_iter()
                .map(|child| child.entry().clone())
                .collect();
            print_entries(SearchScope::OneLevel, &entries, args.json)
        }
    }
}

pub async fn tree(root: &Node, args: TreeArgs) -> anyhow::Result<()> {
    let mut out = String::new();
    let mut pending = vec![root.clone()];

    while let Some(node) = pending.pop() {
        let depth = node.depth();
        let label = if node.is_root() {
            node.dn().to_string()
        } else {
            node.rdn()
        };
        writeln!(out, "{}{label}", "  ".repeat(depth))?;

        if depth < args.depth {
            let children = node
                .children(&args.filter, AttributeSelection::IdentityOnly)
                .await?;
            debug!(dn = %node.dn(), children = children.len(), "expanded");
            pending.extend(children.into_iter().rev());
        }
    }

    print!("{out}");
    Ok(())
}

fn print_entries(scope: SearchScope, entries: &[DirectoryEntry], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", format_json(entries)?);
    } else {
        print!("{}", format_results(scope, entries));
    }
    Ok(())
}
