use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;

use scene_core::core::{Config, SceneConfig};
use scene_core::foundation::logging;
use scene_core::graph::{Graph, NODE_TYPE};
use scene_core::registry::RegistryBuilder;
use scene_core::resources::ResourceLibrary;
use scene_core::serialize::{Serialization, Serializer, Value};

mod report;
use report::{print_load_report, print_mutators};

const DEFAULT_CONFIG_PATH: &str = "scene.toml";

#[derive(Debug)]
struct InspectOptions {
    scene: PathBuf,
    config_path: String,
    show_mutators: bool,
    show_types: bool,
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let matches = Command::new("scene_inspect")
        .about("Loads a serialized scene project and prints its node hierarchy")
        .arg(
            Arg::new("scene")
                .value_name("FILE")
                .help("Project file with `resources` and `graph` sections")
                .required(true),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Scene configuration (.toml or .ron)")
                .default_value(DEFAULT_CONFIG_PATH),
        )
        .arg(
            Arg::new("mutators")
                .short('m')
                .long("mutators")
                .help("Print the mutator of every component")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("types")
                .short('t')
                .long("types")
                .help("Print attribute types next to the mutators")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Write the loaded graph back out as JSON"),
        )
        .get_matches();

    let options = InspectOptions {
        scene: PathBuf::from(matches.get_one::<String>("scene").context("missing scene file")?),
        config_path: matches
            .get_one::<String>("config")
            .cloned()
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned()),
        show_mutators: matches.get_flag("mutators") || matches.get_flag("types"),
        show_types: matches.get_flag("types"),
        output: matches.get_one::<String>("output").map(PathBuf::from),
    };

    let config = SceneConfig::load_or_default(&options.config_path)
        .with_context(|| format!("Failed to load config {}", options.config_path))?;
    config.validate()?;
    if let Err(err) = logging::init_with_level(&config.log_level) {
        eprintln!("Logger already initialized: {err}");
    }

    inspect(&options, &config)
}

fn inspect(options: &InspectOptions, config: &SceneConfig) -> Result<()> {
    let registry = RegistryBuilder::with_builtins().build();
    let serializer = Serializer::new(&registry).with_config(config.serialization);

    let text = std::fs::read_to_string(&options.scene)
        .with_context(|| format!("Failed to read {}", options.scene.display()))?;
    let project = serializer.parse(&text)?;

    let library = ResourceLibrary::new(&registry);
    if let Some(resources) = section(&project, "resources")? {
        let count = library.load_serializations(resources)?;
        log::info!("Stored {count} resource serializations");
    }
    let document = section(&project, "graph")?
        .ok_or_else(|| anyhow!("{} has no `graph` section", options.scene.display()))?;

    let mut graph = Graph::with_config(config.events);
    let load = pollster::block_on(serializer.deserialize_node(&mut graph, document, &library))
        .with_context(|| format!("Failed to load the `{NODE_TYPE}` in {}", options.scene.display()))?;

    println!("{}", graph.hierarchy_string(load.root).trim_end());
    if options.show_mutators {
        println!();
        print_mutators(&graph, load.root, options.show_types);
    }
    print_load_report(&load.report);

    if let Some(output) = &options.output {
        let document = serializer.serialize_node(&mut graph, load.root)?;
        std::fs::write(output, serializer.stringify(&document)?)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("Wrote {}", output.display());
    }
    Ok(())
}

fn section<'p>(project: &'p Serialization, key: &str) -> Result<Option<&'p Serialization>> {
    match project.get(key) {
        None => Ok(None),
        Some(Value::Object(section)) => Ok(Some(section)),
        Some(_) => Err(anyhow!("`{key}` must be an object")),
    }
}
