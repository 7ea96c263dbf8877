//! Resolve command implementation.
//!
//! Shows how import specifiers map through the alias table and where request
//! paths would be routed by the dev server.

use keel_config::{ResolvedConfig, RouteDecision};
use serde::Serialize;

use crate::cli::ResolveArgs;
use crate::error::Result;
use crate::project::{LoadOptions, Overrides, load_project};

#[derive(Debug, Serialize)]
struct Resolution {
    aliases: Vec<AliasResolution>,
    routes: Vec<RouteResolution>,
}

#[derive(Debug, Serialize)]
struct AliasResolution {
    specifier: String,
    resolved: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rule: Option<String>,
}

#[derive(Debug, Serialize)]
struct RouteResolution {
    path: String,
    /// `local` or the backend URI
    target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pattern: Option<String>,
}

/// Execute the resolve command.
pub async fn execute(args: ResolveArgs) -> Result<()> {
    let project = load_project(
        &args.project,
        LoadOptions {
            default_profile: "production",
            overrides: Overrides::default(),
            check_entries: false,
        },
    )?;

    let resolution = resolve(&project.resolved, &args.specifiers, &args.routes);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
    } else {
        for alias in &resolution.aliases {
            println!("{} -> {}", alias.specifier, alias.resolved);
        }
        for route in &resolution.routes {
            println!("{} -> {}", route.path, route.target);
        }
    }

    Ok(())
}

fn resolve(config: &ResolvedConfig, specifiers: &[String], routes: &[String]) -> Resolution {
    let aliases = specifiers
        .iter()
        .map(|specifier| AliasResolution {
            specifier: specifier.clone(),
            resolved: config.aliases().resolve(specifier).into_owned(),
            rule: config
                .aliases()
                .matching_rule(specifier)
                .map(|rule| rule.find().to_string()),
        })
        .collect();

    let routes = routes
        .iter()
        .map(|path_and_query| {
            let path = path_and_query.split('?').next().unwrap_or_default();
            match config.proxy().route(path, "GET") {
                RouteDecision::Forward(rule) => RouteResolution {
                    path: path_and_query.clone(),
                    target: rule.forward_uri(path_and_query),
                    pattern: Some(rule.pattern().as_str().to_string()),
                },
                RouteDecision::Local => RouteResolution {
                    path: path_and_query.clone(),
                    target: "local".to_string(),
                    pattern: None,
                },
            }
        })
        .collect();

    Resolution { aliases, routes }
}
