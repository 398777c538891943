//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use common::protocol::{FieldDescriptor, FieldType};
use fieldcrypt::FieldSpec;

#[derive(Debug, Parser)]
#[command(name = "fieldcrypt")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(about = "Seal, open and hash encrypted PII field values")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print a freshly generated primary key
    GenerateKey,
    /// Encrypt a single value and print the stored form
    Seal {
        #[command(flatten)]
        field: FieldArgs,
        /// Plaintext to encrypt
        value: String,
    },
    /// Decrypt a single stored value and print the plaintext
    Open {
        #[command(flatten)]
        field: FieldArgs,
        /// Fail instead of echoing values that do not decrypt
        #[arg(long)]
        strict: bool,
        /// Stored column value
        stored: String,
    },
    /// Print the search hash of a value
    Hash {
        /// Plaintext to hash
        value: String,
    },
    /// Seal or open NDJSON records read from stdin
    Batch {
        /// JSON file listing the encrypted fields of each record
        #[arg(long)]
        manifest: PathBuf,
        /// Direction of the transformation
        mode: BatchMode,
    },
}

/// Field options shared by `seal` and `open`.
#[derive(Debug, Args)]
pub struct FieldArgs {
    /// Storage flavour of the field
    #[arg(long, value_enum, default_value_t = KindArg::Char)]
    pub kind: KindArg,
    /// Use deterministic encryption
    #[arg(long)]
    pub searchable: bool,
    /// Storage budget of the encrypted value (defaults per kind)
    #[arg(long)]
    pub max_length: Option<usize>,
    /// Field name used in diagnostics
    #[arg(long, default_value = "value")]
    pub name: String,
}

impl FieldArgs {
    pub fn to_spec(&self) -> FieldSpec {
        FieldSpec::from_descriptor(&FieldDescriptor {
            path: self.name.clone(),
            field_type: self.kind.into(),
            searchable: self.searchable,
            max_length: self.max_length,
            original_max_length: None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Char,
    Text,
    Email,
    Date,
}

impl From<KindArg> for FieldType {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Char => FieldType::Char,
            KindArg::Text => FieldType::Text,
            KindArg::Email => FieldType::Email,
            KindArg::Date => FieldType::Date,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BatchMode {
    Seal,
    Open,
}
