use clap::Parser;

use streamtool::cli::display::ReportFormat;
use streamtool::cli::{Cli, Commands};

#[test]
fn test_parse_submitjob() {
    let cli = Cli::try_parse_from([
        "streamtool",
        "submitjob",
        "app.sab",
        "--jobConfig",
        "overlay.json",
        "--jobname",
        "nightly",
        "-J",
        "team",
        "-P",
        "rate=10",
        "-P",
        "mode=fast",
        "-U",
        "admin",
    ])
    .unwrap();

    match cli.command {
        Commands::SubmitJob(args) => {
            assert_eq!(args.sabfile.to_str(), Some("app.sab"));
            assert_eq!(args.job_config.unwrap().to_str(), Some("overlay.json"));
            assert_eq!(args.jobname.as_deref(), Some("nightly"));
            assert_eq!(args.jobgroup.as_deref(), Some("team"));
            assert_eq!(args.params, vec!["rate=10", "mode=fast"]);
            assert_eq!(args.user.user.as_deref(), Some("admin"));
        }
        other => panic!("Wrong command: {other:?}"),
    }
}

#[test]
fn test_parse_canceljob_positional_ids() {
    let cli = Cli::try_parse_from(["streamtool", "canceljob", "1,2", "3", "--force"]).unwrap();

    match cli.command {
        Commands::CancelJob(args) => {
            assert_eq!(args.jobid, vec!["1,2", "3"]);
            assert!(args.force);
            assert!(!args.collectlogs);
            assert!(args.jobs.is_none());
        }
        other => panic!("Wrong command: {other:?}"),
    }
}

#[test]
fn test_parse_canceljob_by_names() {
    let cli = Cli::try_parse_from([
        "streamtool",
        "canceljob",
        "--jobnames",
        "a,b",
        "--collectlogs",
    ])
    .unwrap();

    match cli.command {
        Commands::CancelJob(args) => {
            assert_eq!(args.jobnames.as_deref(), Some("a,b"));
            assert!(args.collectlogs);
            assert!(args.jobid.is_empty());
        }
        other => panic!("Wrong command: {other:?}"),
    }
}

#[test]
fn test_parse_lsjobs_defaults_and_format() {
    let cli = Cli::try_parse_from(["streamtool", "lsjobs"]).unwrap();
    match cli.command {
        Commands::LsJobs(args) => {
            assert_eq!(args.fmt, ReportFormat::Table);
            assert!(!args.xheaders);
        }
        other => panic!("Wrong command: {other:?}"),
    }

    let cli = Cli::try_parse_from([
        "streamtool",
        "lsjobs",
        "--fmt",
        "%Mf",
        "--users",
        "alice",
        "--long",
        "--showtimestamp",
    ])
    .unwrap();
    match cli.command {
        Commands::LsJobs(args) => {
            assert_eq!(args.fmt, ReportFormat::Multiline);
            assert_eq!(args.users.as_deref(), Some("alice"));
            assert!(args.long);
            assert!(args.showtimestamp);
        }
        other => panic!("Wrong command: {other:?}"),
    }

    assert!(Cli::try_parse_from(["streamtool", "lsjobs", "--fmt", "%Qf"]).is_err());
}

#[test]
fn test_parse_appconfig_commands() {
    let cli = Cli::try_parse_from([
        "streamtool",
        "mkappconfig",
        "kafka",
        "--property",
        "a=1",
        "--property",
        "b=2",
        "--propfile",
        "props.txt",
        "--description",
        "brokers",
    ])
    .unwrap();
    match cli.command {
        Commands::MkAppConfig(args) => {
            assert_eq!(args.config_name, "kafka");
            assert_eq!(args.property, vec!["a=1", "b=2"]);
            assert!(args.propfile.is_some());
            assert_eq!(args.description.as_deref(), Some("brokers"));
        }
        other => panic!("Wrong command: {other:?}"),
    }

    let cli = Cli::try_parse_from(["streamtool", "rmappconfig", "kafka", "--noprompt"]).unwrap();
    assert!(matches!(cli.command, Commands::RmAppConfig(ref args) if args.noprompt));

    let cli = Cli::try_parse_from(["streamtool", "getappconfig", "kafka"]).unwrap();
    assert!(matches!(cli.command, Commands::GetAppConfig(ref args) if args.config_name == "kafka"));

    // chappconfig has no --propfile
    assert!(Cli::try_parse_from(["streamtool", "chappconfig", "kafka", "--propfile", "p"]).is_err());
}

#[test]
fn test_parse_checkjob_requires_condition() {
    assert!(Cli::try_parse_from(["streamtool", "checkjob", "5"]).is_err());

    let cli = Cli::try_parse_from([
        "streamtool",
        "checkjob",
        "5",
        "--condition",
        "ExactCount0",
        "-c",
        "TestRunTime",
    ])
    .unwrap();
    match cli.command {
        Commands::CheckJob(args) => {
            assert_eq!(args.jobid, "5");
            assert_eq!(args.conditions, vec!["ExactCount0", "TestRunTime"]);
        }
        other => panic!("Wrong command: {other:?}"),
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "streamtool",
        "lsappconfig",
        "--json",
        "--disable-ssl-verify",
        "--config",
        "custom.yaml",
    ])
    .unwrap();

    assert!(cli.json);
    assert!(cli.disable_ssl_verify);
    assert_eq!(cli.config.unwrap().to_str(), Some("custom.yaml"));
}
