// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use sheath_core::ut;

use super::fail;

const COMMAND: &str = "models";

#[derive(Debug, Args)]
#[command(about = "List available segmentation models.")]
pub struct ModelsArgs {
    #[arg(long, help = "Directory holding one sub-directory per model.", required = true)]
    pub models: Option<String>,

    #[arg(long, help = "Print as JSON.")]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ModelEntry {
    name: String,
    path: String,
}

pub fn models(args: &ModelsArgs) {
    let directory = PathBuf::from(args.models.to_owned().unwrap_or_default());

    let names = ut::path::list_models(&directory).unwrap_or_else(|err| fail(COMMAND, err));

    if args.json {
        let entries: Vec<ModelEntry> = names
            .into_iter()
            .map(|name| ModelEntry {
                path: directory.join(&name).display().to_string(),
                name,
            })
            .collect();

        let json = serde_json::to_string_pretty(&entries).unwrap_or_else(|err| fail(COMMAND, err));
        println!("{}", json);
        return;
    }

    for name in names {
        println!("{}", name);
    }
}
