fn main() {
    if let Err(err) = cli::run() {
        eprintln!("envelope_cli error: {err}");
        std::process::exit(1);
    }
}

mod cli {
    use std::path::PathBuf;
    use std::sync::Arc;

    use parcel_envelope::export::{EnvelopeWriter, IfcWriter, ObjWriter, OutputFormat};
    use parcel_envelope::parse::poum_gml::ZoningIndex;
    use parcel_envelope::pipeline::{EnvelopePipeline, Outcome, ParcelReport};
    use parcel_envelope::source::{FileGeometrySource, ParcelGeometrySource};
    use parcel_envelope::zoning::{Resolution, RuleSet, ZoneRule};
    use parcel_envelope::PipelineConfig;

    const DEFAULT_POUM_PATH: &str = "POUM.gml";

    const USAGE: &str = r#"envelope_cli (parcel-envelope)

USAGE:
  envelope_cli run <refcat> [options]
  envelope_cli batch <refcat>... [options]
  envelope_cli resolve <code>... [--default-height <m>] [--config <xml>]
  envelope_cli zones [--default-height <m>] [--config <xml>]

OPTIONS (run, batch):
  --poum <gml>            POUM zoning GML (default: POUM.gml)
  --parcel-xml <path>     Saved WFS response, or a directory of <refcat>.xml files
  --wfs                   Query the Catastro WFS (needs the `wfs-http` feature)
  --out-dir <dir>         Directory for envelope files (default: .)
  --format <ifc|obj>      Output format (default: ifc)
  --default-height <m>    Height for zones without a rule (default: 10)
  --config <xml>          Pipeline config file; flags override its values
  --overwrite             Overwrite existing output files
  -v, --verbose           Debug logging (RUST_LOG overrides)
  -h, --help              Show this help
"#;

    pub fn run() -> Result<(), String> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let mut args = Args::new(args);

        let Some(command) = args.next() else {
            print_usage();
            return Ok(());
        };

        match command.as_str() {
            "run" => {
                let opts = Options::parse(&mut args)?;
                if opts.positional.len() != 1 {
                    return Err(format!("`run` takes exactly one refcat\n\n{USAGE}"));
                }
                cmd_run(&opts)
            }
            "batch" => {
                let opts = Options::parse(&mut args)?;
                if opts.positional.is_empty() {
                    return Err(format!("`batch` needs at least one refcat\n\n{USAGE}"));
                }
                cmd_run(&opts)
            }
            "resolve" => {
                let opts = Options::parse(&mut args)?;
                init_logging(opts.verbose);
                cmd_resolve(&opts)
            }
            "zones" => {
                let opts = Options::parse(&mut args)?;
                print_zones(&opts)
            }
            "-h" | "--help" | "help" => {
                print_usage();
                Ok(())
            }
            other => Err(format!("unknown command `{other}`\n\n{USAGE}")),
        }
    }

    fn print_usage() {
        println!("{USAGE}");
    }

    fn init_logging(verbose: bool) {
        env_logger::Builder::new()
            .filter_level(if verbose {
                log::LevelFilter::Debug
            } else {
                log::LevelFilter::Info
            })
            .parse_default_env()
            .init();
    }

    #[derive(Debug, Default)]
    struct Options {
        positional: Vec<String>,
        poum: Option<PathBuf>,
        parcel_xml: Option<PathBuf>,
        wfs: bool,
        out_dir: Option<PathBuf>,
        format: OutputFormat,
        default_height: Option<f64>,
        config: Option<PathBuf>,
        overwrite: bool,
        verbose: bool,
    }

    impl Options {
        fn parse(args: &mut Args) -> Result<Self, String> {
            let mut opts = Self::default();
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--poum" => opts.poum = Some(PathBuf::from(args.value("--poum")?)),
                    "--parcel-xml" => {
                        opts.parcel_xml = Some(PathBuf::from(args.value("--parcel-xml")?));
                    }
                    "--wfs" => opts.wfs = true,
                    "--out-dir" => opts.out_dir = Some(PathBuf::from(args.value("--out-dir")?)),
                    "--format" => opts.format = args.value("--format")?.parse()?,
                    "--default-height" => {
                        let raw = args.value("--default-height")?;
                        let height: f64 = raw
                            .parse()
                            .map_err(|e| format!("invalid --default-height `{raw}`: {e}"))?;
                        opts.default_height = Some(height);
                    }
                    "--config" => opts.config = Some(PathBuf::from(args.value("--config")?)),
                    "--overwrite" => opts.overwrite = true,
                    "-v" | "--verbose" => opts.verbose = true,
                    "-h" | "--help" => {
                        print_usage();
                        std::process::exit(0);
                    }
                    flag if flag.starts_with('-') && flag.len() > 1 => {
                        return Err(format!("unknown option `{flag}`\n\n{USAGE}"));
                    }
                    _ => opts.positional.push(arg),
                }
            }
            if opts.wfs && opts.parcel_xml.is_some() {
                return Err("use either --parcel-xml or --wfs (not both)".to_string());
            }
            Ok(opts)
        }

        fn pipeline_config(&self) -> Result<PipelineConfig, String> {
            let mut config = match self.config.as_deref() {
                Some(path) => PipelineConfig::from_path(path).map_err(|e| e.to_string())?,
                None => PipelineConfig::default(),
            };
            if let Some(height) = self.default_height {
                config.default_height_m = height;
            }
            config.overwrite |= self.overwrite;
            config.validate().map_err(|e| e.to_string())?;
            Ok(config)
        }
    }

    fn cmd_run(opts: &Options) -> Result<(), String> {
        init_logging(opts.verbose);
        let config = opts.pipeline_config()?;

        let rules = RuleSet::compiled(config.default_policy()).map_err(|e| e.to_string())?;
        let poum = opts
            .poum
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_POUM_PATH));
        let index = ZoningIndex::from_path(&poum).map_err(|e| e.to_string())?;
        let source = geometry_source(opts, &config)?;
        let writer = envelope_writer(opts.format, &config);

        let pipeline = EnvelopePipeline::new(Arc::new(rules), Arc::new(index), source, writer, config)
            .map_err(|e| e.to_string())?
            .with_out_dir(opts.out_dir.clone().unwrap_or_else(|| PathBuf::from(".")));

        let results = pipeline.run_batch(&opts.positional);
        let mut failed = 0usize;
        for (refcat, result) in opts.positional.iter().zip(results) {
            match result {
                Ok(report) => print_report(&report),
                Err(err) => {
                    failed += 1;
                    eprintln!("{}: {err}", refcat.trim());
                }
            }
        }

        if failed > 0 {
            return Err(format!("{failed} of {} parcels failed", opts.positional.len()));
        }
        Ok(())
    }

    fn geometry_source(
        opts: &Options,
        config: &PipelineConfig,
    ) -> Result<Box<dyn ParcelGeometrySource>, String> {
        if let Some(path) = opts.parcel_xml.as_ref() {
            return Ok(Box::new(FileGeometrySource::new(path.clone())));
        }
        if !opts.wfs {
            return Err(
                "no parcel source: pass --parcel-xml <path> (or --wfs with the `wfs-http` feature)"
                    .to_string(),
            );
        }
        cfg_if::cfg_if! {
            if #[cfg(feature = "wfs-http")] {
                let wfs = parcel_envelope::source::WfsGeometrySource::new(
                    Some(config.wfs_url()),
                    config.wfs_timeout(),
                )
                .map_err(|e| e.to_string())?;
                Ok(Box::new(wfs))
            } else {
                let _ = config;
                Err("--wfs requires building with `--features wfs-http`".to_string())
            }
        }
    }

    fn envelope_writer(format: OutputFormat, config: &PipelineConfig) -> Box<dyn EnvelopeWriter> {
        match format {
            OutputFormat::Ifc => Box::new(
                IfcWriter::new(config.project_name.clone(), config.site_name.clone())
                    .with_overwrite(config.overwrite),
            ),
            OutputFormat::Obj => Box::new(ObjWriter::new().with_overwrite(config.overwrite)),
        }
    }

    fn print_report(report: &ParcelReport) {
        let zone = if report.matched {
            report.zone_key.clone()
        } else {
            format!("{} (no rule, default applied)", report.zone_key)
        };
        println!("{}", report.refcat);
        println!("  vertices:        {}", report.vertex_count);
        println!("  zone:            {zone}");
        println!(
            "  bounding box:    {:.2} m x {:.2} m",
            report.bbox_width_m, report.bbox_depth_m
        );
        println!("  buildable depth: {:.2} m", report.buildability.depth_m);
        println!("  height:          {:.2} m", report.buildability.height_m);
        match &report.outcome {
            Outcome::Emitted { path } => println!("  envelope:        {}", path.display()),
            Outcome::NotBuildable => println!("  envelope:        not buildable, nothing written"),
        }
    }

    fn cmd_resolve(opts: &Options) -> Result<(), String> {
        if opts.positional.is_empty() {
            return Err(format!("`resolve` needs at least one zone code\n\n{USAGE}"));
        }
        let config = opts.pipeline_config()?;
        let rules = RuleSet::compiled(config.default_policy()).map_err(|e| e.to_string())?;

        for code in &opts.positional {
            let (canonical, resolution) = rules.resolve_with_canonical(code.as_str());
            let rule = resolution.rule();
            let depth = rule
                .max_building_depth_m()
                .map_or_else(|| "bbox".to_string(), |d| format!("{d:.2} m"));
            match resolution {
                Resolution::Found(_) => println!(
                    "{code:?} -> {canonical}: height {:.2} m, depth {depth}",
                    rule.max_regulatory_height_m()
                ),
                Resolution::Defaulted(_) => {
                    let hint = rules
                        .closest_known_zone(canonical)
                        .map(|z| format!(" (closest: {z})"))
                        .unwrap_or_default();
                    println!(
                        "{code:?} -> {canonical}: no rule, default height {:.2} m, depth {depth}{hint}",
                        rule.max_regulatory_height_m()
                    );
                }
            }
        }
        Ok(())
    }

    fn print_zones(opts: &Options) -> Result<(), String> {
        let config = opts.pipeline_config()?;
        let rules = RuleSet::compiled(config.default_policy()).map_err(|e| e.to_string())?;
        for rule in rules.rules() {
            print_rule_row(rule.key(), rule);
        }
        print_rule_row("(default)", rules.default_rule());
        for (alias, target) in rules.aliases() {
            println!("{alias:<10} -> {target}");
        }
        Ok(())
    }

    fn print_rule_row(label: &str, rule: &ZoneRule) {
        let depth = rule
            .max_building_depth_m()
            .map_or_else(|| "-".to_string(), |d| format!("{d:.2}"));
        println!(
            "{label:<10} {:>6.2} {depth:>6}  {}",
            rule.max_regulatory_height_m(),
            rule.notes()
        );
    }

    struct Args {
        args: Vec<String>,
        pos: usize,
    }

    impl Args {
        fn new(args: Vec<String>) -> Self {
            Self { args, pos: 0 }
        }

        fn next(&mut self) -> Option<String> {
            let arg = self.args.get(self.pos)?.clone();
            self.pos += 1;
            Some(arg)
        }

        fn value(&mut self, flag: &str) -> Result<String, String> {
            self.next()
                .ok_or_else(|| format!("missing value for {flag}"))
        }
    }

}
