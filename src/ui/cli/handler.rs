// Wed Jan 15 2026 - Alex

use super::args::{AbcArgs, Args, Command, PsArgs, RegionsArgs, ScanArgs, SearchFileArgs, WriteArgs};
use crate::avm::{resolve_name, AbcFile, ConstantPool, TraitsHandle};
use crate::config::Config;
use crate::memory::{Address, BinaryMemory, MemoryWriter, ProcessMemory, RegionScanner, ScanOptions};
use crate::pattern::Pattern;
use crate::utils::{self, logging, ProcessUtils};
use anyhow::Context;
use colored::Colorize;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ScanReport {
    pattern: String,
    matches: Vec<Address>,
}

#[derive(Debug, Serialize)]
struct TraitReport {
    name: String,
    kind: String,
    slot_id: u32,
    payload_id: u32,
    /// Resolved method name for methods and accessors, type name for slots.
    detail: String,
}

#[derive(Debug, Serialize)]
struct ClassReport {
    name: String,
    super_name: String,
    instance_traits: Vec<TraitReport>,
    class_traits: Vec<TraitReport>,
}

#[derive(Debug, Serialize)]
struct AbcReport {
    version: String,
    classes: Vec<ClassReport>,
    scripts: Vec<Vec<TraitReport>>,
}

pub struct CommandHandler {
    config: Config,
}

impl CommandHandler {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn execute(mut self, args: Args) -> anyhow::Result<()> {
        if let Some(path) = &args.config {
            self.config = Config::load(path).with_context(|| format!("loading config {}", path.display()))?;
        }

        self.setup_logging(&args)?;

        match args.command {
            Command::Regions(a) => self.handle_regions(a),
            Command::Scan(a) => self.handle_scan(a),
            Command::Write(a) => self.handle_write(a),
            Command::SearchFile(a) => self.handle_search_file(a),
            Command::Abc(a) => self.handle_abc(a),
            Command::Ps(a) => self.handle_ps(a),
        }
    }

    fn setup_logging(&self, args: &Args) -> anyhow::Result<()> {
        let name = args.log_level.as_deref().unwrap_or(&self.config.general.log_level);
        let level = logging::level_from_str(name).ok_or_else(|| anyhow::anyhow!("Unknown log level '{}'", name))?;

        if args.no_color {
            colored::control::set_override(false);
        }

        if std::env::var_os("RUST_LOG").is_some() {
            logging::init_env_logger(level);
        } else {
            logging::init_logger(level, !args.no_color);
        }

        Ok(())
    }

    fn scanner(&self) -> RegionScanner {
        RegionScanner::from_config(&self.config.scanning)
    }

    fn handle_regions(&self, args: RegionsArgs) -> anyhow::Result<()> {
        let process = ProcessMemory::attach(args.pid)?;
        let scanner = self.scanner();
        let regions = process.enumerate_regions()?;

        let mut shown = 0;
        for region in &regions {
            let scannable = scanner.is_scannable(region);
            if !args.all && !scannable {
                continue;
            }
            shown += 1;

            let line = format!(
                "{:>18}-{:<18} {} {:>10} {}",
                format!("{:x}", region.start()),
                format!("{:x}", region.end()),
                region.protection(),
                utils::format_bytes(region.size()),
                region.backing_name()
            );
            if scannable {
                println!("{}", line);
            } else {
                println!("{}", line.dimmed());
            }
        }

        println!("{}", format!("{} of {} regions", shown, regions.len()).cyan());
        Ok(())
    }

    fn scan_options(&self, max: Option<usize>, align: Option<usize>) -> ScanOptions {
        ScanOptions::new(max.unwrap_or(self.config.scanning.max_results))
            .with_alignment(align.unwrap_or(self.config.scanning.alignment))
    }

    fn handle_scan(&self, args: ScanArgs) -> anyhow::Result<()> {
        args.validate().map_err(|e| anyhow::anyhow!(e))?;

        let process = ProcessMemory::attach(args.pid)?;
        let scanner = self.scanner();

        let reports: Vec<ScanReport> = if args.first {
            let segment = args.segment.as_deref().unwrap_or("");
            args.patterns
                .iter()
                .map(|text| -> anyhow::Result<ScanReport> {
                    let found = scanner.find_pattern(&process, text, segment)?;
                    Ok(ScanReport {
                        pattern: text.clone(),
                        matches: found.into_iter().collect(),
                    })
                })
                .collect::<anyhow::Result<_>>()?
        } else {
            let patterns = args
                .patterns
                .iter()
                .map(|text| Pattern::parse(text))
                .collect::<Result<Vec<_>, _>>()?;

            let mut options = self.scan_options(args.max, args.align);
            if let Some(segment) = &args.segment {
                options = options.with_segment(segment);
            }

            scanner
                .scan_batch(&process, &patterns, &options)
                .into_iter()
                .zip(&patterns)
                .map(|(matches, pattern)| ScanReport {
                    pattern: pattern.to_hex_string(),
                    matches,
                })
                .collect()
        };

        if args.json {
            println!("{}", serde_json::to_string_pretty(&reports)?);
            return Ok(());
        }

        for report in &reports {
            println!("{} {}", "Pattern:".cyan(), report.pattern);
            if report.matches.is_empty() {
                println!("  {}", "no matches".yellow());
            }
            for address in &report.matches {
                println!("  {}", address.to_string().green());
            }
        }
        Ok(())
    }

    fn handle_write(&self, args: WriteArgs) -> anyhow::Result<()> {
        let address =
            Address::parse(&args.address).ok_or_else(|| anyhow::anyhow!("Invalid address '{}'", args.address))?;
        let bytes = utils::parse_hex_bytes(&args.bytes).ok_or_else(|| anyhow::anyhow!("Invalid hex bytes '{}'", args.bytes))?;

        let process = ProcessMemory::attach(args.pid)?;
        let written = process.write_bytes(address, &bytes)?;

        if written == bytes.len() {
            println!("{}", format!("Wrote {} bytes at {}", written, address).green());
        } else {
            println!("{}", format!("Short write at {}: {}/{} bytes", address, written, bytes.len()).yellow());
        }
        Ok(())
    }

    fn handle_search_file(&self, args: SearchFileArgs) -> anyhow::Result<()> {
        let pattern = Pattern::parse(&args.pattern)?;
        let image = BinaryMemory::load(&args.file).with_context(|| format!("loading {}", args.file.display()))?;

        let options = self.scan_options(args.max, args.align);
        let matches = self.scanner().scan_with(&image, &pattern, &options);

        for address in &matches {
            println!("{}", format!("{:#x}", address.as_u64()).green());
        }
        println!("{}", format!("{} match(es) in {}", matches.len(), args.file.display()).cyan());
        Ok(())
    }

    fn handle_abc(&self, args: AbcArgs) -> anyhow::Result<()> {
        let data = std::fs::read(&args.file).with_context(|| format!("reading {}", args.file.display()))?;
        let abc = AbcFile::parse(data)?;
        let report = build_abc_report(&abc)?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!("{} {}", "Bytecode version".cyan(), report.version);
        for class in &report.classes {
            println!("{} {} extends {}", "class".bold(), class.name.green(), class.super_name);
            for t in &class.class_traits {
                println!("  static {:<8} {}", t.kind, t.detail);
            }
            for t in &class.instance_traits {
                println!("  {:<15} {}", t.kind, t.detail);
            }
        }
        for (i, script) in report.scripts.iter().enumerate() {
            println!("{} {}", "script".bold(), i);
            for t in script {
                println!("  {:<15} {}", t.kind, t.detail);
            }
        }
        Ok(())
    }

    fn handle_ps(&self, args: PsArgs) -> anyhow::Result<()> {
        let processes = ProcessUtils::find_processes_by_name(&args.name);
        if processes.is_empty() {
            println!("{}", format!("No process matches '{}'", args.name).yellow());
            return Ok(());
        }

        for process in processes {
            let rss = ProcessUtils::resident_memory_kb(process.pid)
                .map(|kb| utils::format_bytes(kb * 1024))
                .unwrap_or_else(|| "?".to_string());
            println!("{:>7} {:>10} {}", process.pid.to_string().green(), rss, process.cmdline);
        }
        Ok(())
    }
}

impl Default for CommandHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn trait_reports(abc: &AbcFile, scope: TraitsHandle<'_>) -> anyhow::Result<Vec<TraitReport>> {
    let traits = crate::avm::decode_traits(&scope)?;

    Ok(traits
        .records()
        .iter()
        .map(|record| {
            let detail = if record.kind.is_accessor_or_method() {
                resolve_name(&abc.method_handle(record.payload_id, Some(scope))).to_string()
            } else {
                let type_name = abc.multiname(record.type_id).unwrap_or_else(|| "*".to_string());
                format!("{}: {}", record.name, type_name)
            };
            TraitReport {
                name: record.name.clone(),
                kind: record.kind.to_string(),
                slot_id: record.slot_id,
                payload_id: record.payload_id,
                detail,
            }
        })
        .collect())
}

fn build_abc_report(abc: &AbcFile) -> anyhow::Result<AbcReport> {
    let (major, minor) = abc.version();
    let mut classes = Vec::with_capacity(abc.class_count());

    for i in 0..abc.class_count() {
        let (Some(instance), Some(class)) = (abc.instance_traits(i), abc.class_traits(i)) else {
            continue;
        };
        let header = crate::avm::decode_traits(&instance)?.header.clone();
        classes.push(ClassReport {
            name: abc.multiname(header.name_index).unwrap_or_default(),
            super_name: abc.multiname(header.super_index).unwrap_or_else(|| "*".to_string()),
            instance_traits: trait_reports(abc, instance)?,
            class_traits: trait_reports(abc, class)?,
        });
    }

    let scripts = (0..abc.script_count())
        .filter_map(|i| abc.script_traits(i))
        .map(|scope| trait_reports(abc, scope))
        .collect::<anyhow::Result<_>>()?;

    Ok(AbcReport {
        version: format!("{}.{}", major, minor),
        classes,
        scripts,
    })
}
