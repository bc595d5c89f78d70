//! CLI command definitions using clap.
//!
//! - project: create/list projects
//! - send: submit a request and (by default) wait for the agent
//! - messages / files: inspect a project's conversation and latest fragment
//! - worker: long-running job worker
//! - jobs: queue status, or the completed steps of one job
//! - credits: remaining allowance

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Vibe - describe an app, get it built in a sandbox
#[derive(Parser, Debug)]
#[command(name = "vibe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Project management
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Send a request to the coding agent
    Send {
        project_id: String,

        prompt: String,

        /// Enqueue only; leave the job to a running worker
        #[arg(short, long)]
        detach: bool,
    },

    /// Show a project's conversation
    Messages { project_id: String },

    /// Show the files of a project's latest fragment
    Files {
        project_id: String,

        /// Print file contents too
        #[arg(long)]
        content: bool,
    },

    /// Run the job worker until Ctrl-C
    Worker,

    /// Show queued jobs, or the completed steps of one job
    Jobs { job_id: Option<String> },

    /// Show remaining credits
    Credits,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a project
    New {
        /// Project name (generated when omitted)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List projects, most recent first
    List,
}
