//! CLI module - Command-line interface for Clubdesk
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// Clubdesk - Club member accounts
/// Sign in, register and manage your club profile
#[derive(Parser)]
#[command(name = "clubdesk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and check the account state
    Login {
        /// Email address (prompted when omitted)
        email: Option<String>,
    },

    /// Register a new member account
    #[command(alias = "signup")]
    Register,

    /// Email a password reset link
    #[command(alias = "forgot-password")]
    Forgot {
        /// Email address (prompted when omitted)
        email: Option<String>,
    },

    /// Set a new password from a reset link
    Reset {
        /// Full link from the reset email
        link: String,
    },

    /// View or edit your profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Change your password
    #[command(alias = "passwd")]
    Password,

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Show your profile
    Show,
    /// Edit your profile (interactive)
    Edit,
}

pub use commands::*;
