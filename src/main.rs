//! Cabinet CLI
//!
//! Command-line front end for the cabinet library: edit HyperSpin INI files without
//! disturbing their formatting, manage TeknoParrot profiles, relocate game libraries and
//! run batch conversions.
//!
//! # Usage
//!
//! ```bash
//! # Read and edit one value
//! cabinet ini get "Settings/Global Settings.ini" Main Menu_Mode
//! cabinet ini set "Settings/Global Settings.ini" Main Menu_Mode multi
//!
//! # List profiles in a category and write launchers for them
//! cabinet profiles list --dir UserProfiles --category LIGHTGUN
//! cabinet profiles bat --dir UserProfiles --out launchers
//! cabinet profiles play --exe "C:\TeknoParrot\TeknoParrotUi.exe" "Time Crisis 5"
//!
//! # Move all profiles to drive F:
//! cabinet relocate profiles --dir UserProfiles --drive F
//!
//! # Re-encode every video in a folder
//! cabinet encode --folder "Media/MAME/Video"
//! ```
//!
//! Last-used paths are remembered in `settings.json` next to the executable.

use anyhow::{Context, Result, bail};
use cabinet::hyperspin::{self, IniGroup};
use cabinet::jobs::{BatchDriver, CommandRunner, JobReport};
use cabinet::media::{self, EncodeJob, EncodeObserver};
use cabinet::teknoparrot::{self, DEFAULT_CATEGORY_ROOT, LaunchOptions, Profile};
use cabinet::{IniDocument, Settings, ValueKind, relocate, xiso};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "cabinet")]
#[command(author, version, about = "Arcade frontend INI and batch tools", long_about = None)]
struct Cli {
    /// Settings file (default: settings.json next to the executable)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read and edit INI files in place
    Ini {
        #[command(subcommand)]
        action: IniAction,
    },

    /// Show how a value is typed
    Classify { value: String },

    /// TeknoParrot profiles
    Profiles {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Move game paths to another drive or folder
    Relocate {
        #[command(subcommand)]
        action: RelocateAction,
    },

    /// HyperSpin settings folder
    Hyperspin {
        #[command(subcommand)]
        action: HyperspinAction,
    },

    /// Repack every ISO in a folder with xdvdfs
    Xiso {
        /// Folder holding the ISO files
        #[arg(long)]
        folder: Option<PathBuf>,

        /// Packer executable
        #[arg(long)]
        packer: Option<PathBuf>,
    },

    /// Re-encode every video in a folder to H.264/AAC, replacing the originals
    Encode {
        /// Folder holding the videos
        #[arg(long)]
        folder: Option<PathBuf>,

        /// ffmpeg executable
        #[arg(long)]
        ffmpeg: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum IniAction {
    /// Print one value
    Get {
        file: PathBuf,
        section: String,
        key: String,
    },

    /// Set one value, adding the key (and section) when missing
    Set {
        file: PathBuf,
        section: String,
        key: String,
        value: String,
    },

    /// Remove one key
    Remove {
        file: PathBuf,
        section: String,
        key: String,
    },

    /// List section names
    Sections { file: PathBuf },

    /// Print every entry with its value type
    Show { file: PathBuf },
}

#[derive(clap::Args)]
struct ProfileArgs {
    /// UserProfiles folder
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Only profiles in this category
    #[arg(long)]
    category: Option<String>,

    /// Path fragment the categories are rooted at
    #[arg(long, default_value = DEFAULT_CATEGORY_ROOT)]
    root: String,
}

#[derive(clap::Args)]
struct LaunchArgs {
    /// TeknoParrotUi executable
    #[arg(long)]
    exe: Option<String>,

    /// Extra launcher arguments
    #[arg(long, allow_hyphen_values = true)]
    extra_args: Option<String>,

    /// Do not pass --startMinimized
    #[arg(long)]
    no_minimized: bool,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// List profiles with their categories
    List {
        #[command(flatten)]
        profiles: ProfileArgs,
    },

    /// Start TeknoParrot with one profile
    Play {
        #[command(flatten)]
        profiles: ProfileArgs,
        #[command(flatten)]
        launch: LaunchArgs,

        /// Profile name or file stem
        name: String,
    },

    /// Write a .bat launcher per profile
    Bat {
        #[command(flatten)]
        profiles: ProfileArgs,
        #[command(flatten)]
        launch: LaunchArgs,

        /// Output folder
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Write a `name = stem` listing
    Listing {
        #[command(flatten)]
        profiles: ProfileArgs,

        /// Output text file
        #[arg(long)]
        out: PathBuf,
    },

    /// Write one section per profile into a frontend INI module
    Dump {
        #[command(flatten)]
        profiles: ProfileArgs,
        #[command(flatten)]
        launch: LaunchArgs,

        /// INI module to update
        #[arg(long)]
        ini: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum RelocateAction {
    /// Swap the drive letter of every profile's GamePath
    Profiles {
        /// UserProfiles folder
        #[arg(long)]
        dir: Option<PathBuf>,

        /// New drive letter
        #[arg(long)]
        drive: String,
    },

    /// Rebase every `application` path of a PC games INI under a new root
    PcGames {
        /// PC Games INI file
        #[arg(long)]
        ini: Option<PathBuf>,

        /// New root folder
        #[arg(long)]
        root: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum GroupArg {
    Hyperspin,
    MainMenu,
    Systems,
}

impl From<GroupArg> for IniGroup {
    fn from(group: GroupArg) -> Self {
        match group {
            GroupArg::Hyperspin => IniGroup::HyperSpin,
            GroupArg::MainMenu => IniGroup::MainMenuChanger,
            GroupArg::Systems => IniGroup::Systems,
        }
    }
}

#[derive(Subcommand)]
enum HyperspinAction {
    /// List the INI files of each group
    List {
        /// HyperSpin Settings folder
        #[arg(long)]
        folder: Option<PathBuf>,

        /// Only this group
        #[arg(long, value_enum)]
        group: Option<GroupArg>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings_path = cli.settings.clone().unwrap_or_else(Settings::default_path);
    let mut settings = Settings::load(&settings_path);

    let remember = match cli.command {
        Commands::Ini { action } => cmd_ini(action, &mut settings)?,
        Commands::Classify { value } => {
            let kind = ValueKind::classify(&value);
            println!("{}\t{:?}", kind.type_name(), kind);
            false
        }
        Commands::Profiles { action } => cmd_profiles(action, &mut settings)?,
        Commands::Relocate { action } => cmd_relocate(action, &mut settings)?,
        Commands::Hyperspin { action } => cmd_hyperspin(action, &mut settings)?,
        Commands::Xiso { folder, packer } => cmd_xiso(folder, packer, &mut settings)?,
        Commands::Encode { folder, ffmpeg } => cmd_encode(folder, ffmpeg, &mut settings)?,
    };

    if remember {
        settings
            .save(&settings_path)
            .with_context(|| format!("Failed to save {}", settings_path.display()))?;
    }
    Ok(())
}

/// Explicit flag, else the remembered setting, else an error naming the flag
fn pick_path(flag: Option<PathBuf>, remembered: &str, name: &str) -> Result<PathBuf> {
    match flag {
        Some(path) => Ok(path),
        None if !remembered.is_empty() => Ok(PathBuf::from(remembered)),
        None => bail!("No {name} given and none remembered; pass --{name}"),
    }
}

fn load_ini(file: &Path) -> Result<IniDocument> {
    IniDocument::load(file).with_context(|| format!("Failed to load {}", file.display()))
}

fn cmd_ini(action: IniAction, settings: &mut Settings) -> Result<bool> {
    match action {
        IniAction::Get { file, section, key } => {
            let doc = load_ini(&file)?;
            match doc.get(&section, &key) {
                Some(value) => println!("{value}"),
                None => bail!("[{section}] {key} not found in {}", file.display()),
            }
            Ok(false)
        }
        IniAction::Set {
            file,
            section,
            key,
            value,
        } => {
            let mut doc = load_ini(&file)?;
            doc.set(&section, &key, &value)?;
            doc.save()?;
            settings.last_ini = file.display().to_string();
            Ok(true)
        }
        IniAction::Remove { file, section, key } => {
            let mut doc = load_ini(&file)?;
            if !doc.remove(&section, &key) {
                bail!("[{section}] {key} not found in {}", file.display());
            }
            doc.save()?;
            settings.last_ini = file.display().to_string();
            Ok(true)
        }
        IniAction::Sections { file } => {
            for section in load_ini(&file)?.sections() {
                println!("{section}");
            }
            Ok(false)
        }
        IniAction::Show { file } => {
            let doc = load_ini(&file)?;
            for section in doc.sections() {
                println!("[{section}]");
                for (key, value) in doc.items(section) {
                    let kind = ValueKind::classify(value);
                    println!("  {key} = {value}  ({})", kind.type_name());
                }
            }
            Ok(false)
        }
    }
}

/// Scan, categorize and filter profiles; remembers the folder and category
fn load_profiles(args: &ProfileArgs, settings: &mut Settings) -> Result<Vec<Profile>> {
    let dir = pick_path(args.dir.clone(), &settings.userprofiles, "dir")?;
    let categories = teknoparrot::static_categories(&args.root);

    let mut profiles = teknoparrot::scan_profiles(&dir)
        .with_context(|| format!("Failed to scan {}", dir.display()))?;
    teknoparrot::categorize(&mut profiles, &categories);
    settings.userprofiles = dir.display().to_string();

    let Some(label) = &args.category else {
        return Ok(profiles);
    };
    let category = categories
        .iter()
        .find(|c| c.label.eq_ignore_ascii_case(label))
        .with_context(|| format!("Unknown category '{label}'"))?;
    settings.last_category = category.label.clone();

    Ok(teknoparrot::filter(&profiles, category)
        .into_iter()
        .cloned()
        .collect())
}

fn launch_options(args: &LaunchArgs, settings: &mut Settings) -> LaunchOptions {
    if let Some(exe) = &args.exe {
        settings.exe = exe.clone();
    }
    if let Some(extra) = &args.extra_args {
        settings.extra_args = extra.clone();
    }
    settings.start_minimized = !args.no_minimized;

    LaunchOptions {
        exe: settings.exe.clone(),
        start_minimized: settings.start_minimized,
        extra_args: settings.extra_args.clone(),
    }
}

fn cmd_profiles(action: ProfileAction, settings: &mut Settings) -> Result<bool> {
    match action {
        ProfileAction::List { profiles } => {
            let profiles = load_profiles(&profiles, settings)?;
            for profile in &profiles {
                println!(
                    "{}\t{}\t{}",
                    profile.name, profile.category, profile.game_path
                );
            }
            info!(count = profiles.len(), "profiles");
        }
        ProfileAction::Play {
            profiles,
            launch,
            name,
        } => {
            let profiles = load_profiles(&profiles, settings)?;
            let options = launch_options(&launch, settings);
            let Some(profile) = teknoparrot::find_profile(&profiles, &name) else {
                bail!("No profile named '{name}'");
            };
            options
                .launch(profile)
                .with_context(|| format!("Failed to launch {}", profile.name))?;
            println!("Launched {}", profile.name);
        }
        ProfileAction::Bat {
            profiles,
            launch,
            out,
        } => {
            let profiles = load_profiles(&profiles, settings)?;
            let options = launch_options(&launch, settings);
            let out = pick_path(out, &settings.output, "out")?;

            let mut created = 0;
            for profile in &profiles {
                match teknoparrot::write_bat(profile, &out, &options) {
                    Ok(path) => {
                        println!("Created: {}", path.display());
                        created += 1;
                    }
                    Err(e) => eprintln!("Error writing launcher for {}: {e}", profile.name),
                }
            }
            settings.output = out.display().to_string();
            println!("Created {created} .bat files in {}", out.display());
        }
        ProfileAction::Listing { profiles, out } => {
            let profiles = load_profiles(&profiles, settings)?;
            std::fs::write(&out, teknoparrot::listing(&profiles))
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!("Listing written: {}", out.display());
        }
        ProfileAction::Dump {
            profiles,
            launch,
            ini,
        } => {
            let profiles = load_profiles(&profiles, settings)?;
            let options = launch_options(&launch, settings);
            let ini = pick_path(ini, &settings.last_ini, "ini")?;

            let mut doc = match IniDocument::load(&ini) {
                Ok(doc) => doc,
                Err(e) if e.is_not_found() => IniDocument::new(),
                Err(e) => return Err(e).context(format!("Failed to load {}", ini.display())),
            };
            let count = teknoparrot::dump_to_ini(&mut doc, &profiles, &options)?;
            doc.save_as(&ini)?;
            settings.last_ini = ini.display().to_string();
            println!("Dumped {count} profiles into {}", ini.display());
        }
    }
    Ok(true)
}

fn cmd_relocate(action: RelocateAction, settings: &mut Settings) -> Result<bool> {
    match action {
        RelocateAction::Profiles { dir, drive } => {
            let dir = pick_path(dir, &settings.userprofiles, "dir")?;
            let Some(letter) = drive.chars().next().filter(|c| c.is_ascii_alphabetic()) else {
                bail!("Invalid drive letter '{drive}'");
            };

            let report = relocate::relocate_profiles(&dir, letter, &mut |line: &str| {
                println!("{line}")
            })?;
            println!(
                "Profiles modified: {} of {} ({} errors)",
                report.modified,
                report.scanned,
                report.errors.len()
            );
            settings.userprofiles = dir.display().to_string();
            settings.drive_letter = letter.to_ascii_uppercase().to_string();
        }
        RelocateAction::PcGames { ini, root } => {
            let ini = pick_path(ini, &settings.pc_ini_file, "ini")?;
            let root = match root {
                Some(root) => root,
                None if !settings.pc_games_dir.is_empty() => settings.pc_games_dir.clone(),
                None => bail!("No root given and none remembered; pass --root"),
            };

            let mut doc = load_ini(&ini)?;
            let modified = relocate::relocate_pc_games(&mut doc, &root, &mut |line: &str| {
                println!("{line}")
            });
            doc.save()?;
            println!("Entries modified: {modified}");
            settings.pc_ini_file = ini.display().to_string();
            settings.pc_games_dir = root;
        }
    }
    Ok(true)
}

fn cmd_hyperspin(action: HyperspinAction, settings: &mut Settings) -> Result<bool> {
    let HyperspinAction::List { folder, group } = action;
    let folder = pick_path(folder, &settings.settings_folder, "folder")?;
    let available = hyperspin::list_ini_files(&folder);

    let groups = match group {
        Some(group) => vec![IniGroup::from(group)],
        None => IniGroup::ALL.to_vec(),
    };
    for group in groups {
        println!("{group}:");
        for file in hyperspin::files_for(group, &available) {
            println!("  {file}");
        }
    }

    settings.settings_folder = folder.display().to_string();
    Ok(true)
}

fn print_reports(reports: &[JobReport]) {
    for report in reports {
        println!("{}\t{}", report.label, report.status);
    }
    let ok = reports.iter().filter(|r| r.status.is_success()).count();
    println!("{ok} of {} succeeded", reports.len());
}

fn cmd_xiso(
    folder: Option<PathBuf>,
    packer: Option<PathBuf>,
    settings: &mut Settings,
) -> Result<bool> {
    let folder = pick_path(folder, &settings.iso_folder, "folder")?;
    let packer = pick_path(packer, &settings.xdvdfs_path, "packer")?;

    let jobs = xiso::scan_isos(&folder)?
        .iter()
        .map(|iso| xiso::pack_job(&packer, iso))
        .collect::<Vec<_>>();
    if jobs.is_empty() {
        println!("No ISO files found in {}", folder.display());
    }

    let reports = BatchDriver::new().run(jobs, &mut CommandRunner, &mut ())?;
    print_reports(&reports);

    settings.iso_folder = folder.display().to_string();
    settings.xdvdfs_path = packer.display().to_string();
    Ok(true)
}

fn cmd_encode(
    folder: Option<PathBuf>,
    ffmpeg: Option<PathBuf>,
    settings: &mut Settings,
) -> Result<bool> {
    let folder = pick_path(folder, &settings.last_folder, "folder")?;
    let explicit = ffmpeg
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| settings.ffmpeg_path.clone());
    let ffmpeg = media::locate_ffmpeg(Some(explicit.as_str()))
        .context("ffmpeg not found; pass --ffmpeg or put it on PATH")?;

    let encodes = media::scan_videos(&folder)?
        .into_iter()
        .map(EncodeJob::new)
        .collect::<Vec<_>>();
    let jobs = encodes
        .iter()
        .map(|e| e.to_job(&ffmpeg))
        .collect::<Vec<_>>();

    let mut last = None;
    let mut observer = EncodeObserver::new(&ffmpeg, &encodes, |label: &str, percent: u8| {
        if last != Some((label.to_string(), percent)) {
            eprintln!("{label}: {percent}%");
            last = Some((label.to_string(), percent));
        }
    });
    let reports = BatchDriver::new().run(jobs, &mut CommandRunner, &mut observer)?;
    print_reports(&reports);

    settings.last_folder = folder.display().to_string();
    settings.ffmpeg_path = ffmpeg.display().to_string();
    Ok(true)
}
