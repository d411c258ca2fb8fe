//! `info`: describe the contents of a data set

use anyhow::{Context, Result};
use console::style;
use mc_particle_data::{DataSet, HOOKS, SourceKind};

use crate::cli::InfoArgs;
use crate::commands::load_catalog;
use crate::utils::{
    add_table_row, create_table, format_behavior, format_lifetime, format_optional, format_vec3,
};

pub fn execute(args: InfoArgs) -> Result<()> {
    let (catalog, reports) = load_catalog(std::slice::from_ref(&args.file))?;
    let version = reports
        .first()
        .map(|r| r.version)
        .context("No data set loaded")?;
    let set = catalog.data_set(version)?;

    println!("{}", style("Particle Data Set").bold().cyan());
    println!("{}", style("=================").cyan());
    println!("File: {}", args.file.display());
    println!("Version: {version}");
    println!("Profiles: {}", set.profiles().len());
    println!("Rules: {}", set.rules().len());
    println!();

    print_profiles(set);
    println!();
    print_rules(set);

    if args.hooks {
        println!();
        let mut table = create_table(&["Hook", "Arguments", "this"]);
        for hook in HOOKS {
            add_table_row(
                &mut table,
                vec![
                    format!("{}:{}", hook.source, hook.name),
                    hook.to_string(),
                    format!("${}", hook.this_slot),
                ],
            );
        }
        table.printstd();
    }
    Ok(())
}

fn print_profiles(set: &DataSet) {
    let mut table = create_table(&[
        "Particle", "Lifetime", "Gravity", "Friction", "Behavior", "Textures", "Children",
    ]);
    for profile in set.profiles().iter() {
        let children: Vec<&str> = profile.child_ids().collect();
        add_table_row(
            &mut table,
            vec![
                profile.id.clone(),
                format_lifetime(profile.lifetime),
                format_optional(profile.gravity),
                profile.friction.map_or_else(|| "-".to_string(), format_vec3),
                format_behavior(profile.behavior),
                profile.textures.len().to_string(),
                if children.is_empty() {
                    "-".to_string()
                } else {
                    children.join(", ")
                },
            ],
        );
    }
    table.printstd();
}

fn print_rules(set: &DataSet) {
    let mut table = create_table(&["Source", "Hook", "Particle", "Condition", "Probability"]);
    for kind in [SourceKind::Block, SourceKind::Entity] {
        for id in set.rules().sources(kind) {
            for hook in HOOKS.iter().filter(|h| h.source == kind) {
                for rule in set.lookup(kind, id, hook.name) {
                    add_table_row(
                        &mut table,
                        vec![
                            format!("{kind}:{id}"),
                            hook.name.to_string(),
                            rule.particle.clone(),
                            rule.condition
                                .as_ref()
                                .map_or_else(|| "-".to_string(), ToString::to_string),
                            rule.probability
                                .as_ref()
                                .map_or_else(|| "-".to_string(), |p| p.source().to_string()),
                        ],
                    );
                }
            }
        }
    }
    table.printstd();
}
