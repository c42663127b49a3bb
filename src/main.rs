use anyhow::{anyhow, Context, Result};
use clap::{crate_version, App, AppSettings, Arg, ArgMatches, SubCommand};
use quire::article::{Kind, Loader};
use quire::build::{check_templates, Generator, Mode};
use quire::config::Config;
use quire::upload::{upload, DirectoryRemote, Remote};
use std::env;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// The flags selecting which parts of the site `generate`, `upload` and
/// `scribe` touch.
fn mode_args<'a, 'b>() -> Vec<Arg<'a, 'b>> {
    vec![
        Arg::with_name("drafts-only")
            .long("drafts-only")
            .short("d")
            .help("Only process drafts (and the indexes)"),
        Arg::with_name("resources-only")
            .long("resources-only")
            .short("r")
            .help("Only process resources"),
        Arg::with_name("index-only")
            .long("index-only")
            .short("i")
            .help("Only process index pages, the feed and the sitemap"),
        Arg::with_name("force")
            .long("force")
            .short("f")
            .help("Rewrite or resend every file even if it is up to date"),
    ]
}

fn app<'a, 'b>() -> App<'a, 'b> {
    let project = Arg::with_name("project")
        .long("project")
        .short("p")
        .takes_value(true)
        .value_name("FILE")
        .help("The project file to use instead of searching for quire.yaml");

    App::new("quire")
        .version(crate_version!())
        .about("A static blog generator")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("verbose")
                .long("verbose")
                .short("v")
                .global(true)
                .help("Log debug output"),
        )
        .subcommand(
            SubCommand::with_name("init")
                .about("Creates a new project")
                .arg(Arg::with_name("ROOT").help("The project directory (defaults to the current directory)")),
        )
        .subcommand(
            SubCommand::with_name("check")
                .about("Validates the configuration, articles and templates")
                .arg(project.clone()),
        )
        .subcommand(
            SubCommand::with_name("generate")
                .about("Generates the site")
                .arg(project.clone())
                .args(&mode_args()),
        )
        .subcommand(
            SubCommand::with_name("upload")
                .about("Mirrors the generated site to the upload destination")
                .arg(project.clone())
                .args(&mode_args()),
        )
        .subcommand(
            SubCommand::with_name("scribe")
                .about("Generates the site, then uploads it")
                .arg(project)
                .args(&mode_args()),
        )
}

fn main() {
    let matches = app().get_matches();
    init_tracing(is_verbose(&matches));

    if let Err(err) = run(&matches) {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn is_verbose(matches: &ArgMatches) -> bool {
    matches.is_present("verbose")
        || matches
            .subcommand()
            .1
            .map(|sub| sub.is_present("verbose"))
            .unwrap_or(false)
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        ("init", Some(matches)) => init(matches),
        ("check", Some(matches)) => check(matches),
        ("generate", Some(matches)) => generate(matches),
        ("upload", Some(matches)) => publish(matches),
        ("scribe", Some(matches)) => {
            generate(matches)?;
            publish(matches)
        }
        (name, _) => Err(anyhow!("Unknown command `{}`", name)),
    }
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    match matches.value_of("project") {
        Some(path) => Config::from_project_file(Path::new(path)),
        None => Config::from_directory(&env::current_dir()?),
    }
}

fn init(matches: &ArgMatches) -> Result<()> {
    let root = match matches.value_of("ROOT") {
        Some(root) => PathBuf::from(root),
        None => env::current_dir()?,
    };
    let config = Config::write_default(&root)?;
    println!("Created {}", config.project_file.display());
    Ok(())
}

fn check(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    println!("{}", config);

    let articles =
        Loader::new(&config.date_format, &config.author).load_articles(&config.articles_directory);
    let drafts = articles
        .iter()
        .filter(|article| article.kind() == Kind::Draft)
        .count();
    println!(
        "articles:          {} public, {} drafts",
        articles.len() - drafts,
        drafts
    );

    check_templates(&config.template_directory)
        .with_context(|| format!("Checking `{}`", config.template_directory.display()))?;
    println!("templates:         ok");

    if let Some(dir) = &config.upload_directory {
        DirectoryRemote::new(dir)
            .check()
            .with_context(|| format!("Checking upload destination `{}`", dir.display()))?;
        println!("upload destination: ok");
    }
    Ok(())
}

/// Translates the generate flags into a [`Mode`].
fn mode(matches: &ArgMatches) -> Mode {
    let mut mode = Mode::ALL;
    if matches.is_present("drafts-only") {
        mode = mode.without(Mode::ARTICLES | Mode::RESOURCES) | Mode::DRAFTS;
    }
    if matches.is_present("resources-only") {
        mode = mode.without(Mode::ARTICLES | Mode::DRAFTS | Mode::INDEX) | Mode::RESOURCES;
    }
    if matches.is_present("index-only") {
        mode = mode.without(Mode::ARTICLES | Mode::DRAFTS | Mode::RESOURCES) | Mode::INDEX;
    }
    if matches.is_present("force") {
        mode = mode | Mode::FORCE;
    }
    mode
}

fn generate(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let mode = mode(matches);
    let generator = Generator::new(&config)?;
    let articles =
        Loader::new(&config.date_format, &config.author).load_articles(&config.articles_directory);
    info!(count = articles.len(), ?mode, "generating");

    let report = generator.generate(&articles, mode)?;
    println!("{}", report);
    if !report.resources && mode.contains(Mode::RESOURCES) {
        println!("Some resources could not be copied");
    }
    Ok(())
}

fn publish(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let dir = config.upload_directory.as_ref().ok_or_else(|| {
        anyhow!(
            "No upload destination configured (set `paths.upload` in `{}`)",
            config.project_file.display()
        )
    })?;
    let mut remote = DirectoryRemote::new(dir);
    remote
        .check()
        .with_context(|| format!("Checking upload destination `{}`", dir.display()))?;

    let mode = mode(matches);
    info!(destination = %dir.display(), ?mode, "uploading");
    let transfer = upload(&mut remote, &config.output_directory, mode);
    println!("{}", transfer);
    Ok(())
}
