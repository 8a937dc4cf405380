// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::process::ExitCode;

use schemars::r#gen::SchemaSettings;

fn main() -> ExitCode {
    let generator = SchemaSettings::draft07().into_generator();
    let schema = generator.into_root_schema_for::<oalink_config::RootConfig>();

    match serde_json::to_writer_pretty(std::io::stdout(), &schema) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Failed to serialize schema: {e}");
            ExitCode::FAILURE
        }
    }
}
