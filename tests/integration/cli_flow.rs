use crate::support::{test_config, ScriptedClient};
use clap::Parser;
use hoyofiles::error::ApiError;
use hoyofiles::tooling::cli::{Cli, CliContext, Commands};
use std::sync::Arc;

fn context() -> CliContext {
    let client = Arc::new(
        ScriptedClient::new()
            .with_catalog("hk4e", &["3.0", "3.1"])
            .with_catalog("nap", &["1.0"])
            .with_manifest(
                "hk4e",
                "3.1",
                "pkg_version",
                &[
                    ("UI/icon.png", 100),
                    ("UI/fonts/a.ttf", 50),
                    ("readme.txt", 20),
                    ("Data/file.md5list", 1),
                ],
            ),
    );
    CliContext::with_client(test_config(0), client)
}

fn parse(args: &[&str]) -> Commands {
    Cli::try_parse_from(args).unwrap().command
}

#[test]
fn parse_valid_command_matrix() {
    let cases: Vec<Vec<&str>> = vec![
        vec!["hoyofiles", "games"],
        vec!["hoyofiles", "versions", "hk4e"],
        vec!["hoyofiles", "packages", "hk4e", "--version", "5.0"],
        vec!["hoyofiles", "files", "hk4e", "--voice", "英语", "--voice", "日语", "--depth", "2"],
        vec!["hoyofiles", "files", "nap", "--path", "ZenlessZoneZero_Data"],
        vec!["hoyofiles", "search", "hk4e", "md5", "--limit", "20"],
        vec!["hoyofiles", "preload"],
        vec!["hoyofiles", "preload", "hk4e", "nap"],
        vec!["hoyofiles", "--log-level", "debug", "games"],
        vec!["hoyofiles", "versions", "hk4e", "--config", "/tmp/hoyofiles.toml"],
    ];
    for args in cases {
        assert!(Cli::try_parse_from(args.clone()).is_ok(), "expected valid parse for {args:?}");
    }
}

#[test]
fn parse_rejects_missing_arguments() {
    assert!(Cli::try_parse_from(["hoyofiles", "versions"]).is_err());
    assert!(Cli::try_parse_from(["hoyofiles", "search", "hk4e"]).is_err());
    assert!(Cli::try_parse_from(["hoyofiles", "files", "hk4e", "--depth", "deep"]).is_err());
}

#[test]
fn repeated_voice_flags_collect() {
    match parse(&["hoyofiles", "files", "hk4e", "--voice", "英语", "--voice", "汉语"]) {
        Commands::Files { voices, version, .. } => {
            assert_eq!(voices, vec!["英语".to_string(), "汉语".to_string()]);
            assert_eq!(version, None);
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[tokio::test]
async fn versions_lists_newest_first() {
    let mut ctx = context();
    let out = ctx.execute(&parse(&["hoyofiles", "versions", "hk4e"])).await.unwrap();
    let newest = out.find("3.1").unwrap();
    let oldest = out.find("3.0").unwrap();
    assert!(newest < oldest);
    assert!(out.contains("(latest)"));
}

#[tokio::test]
async fn files_defaults_to_latest_version() {
    let mut ctx = context();
    let out = ctx.execute(&parse(&["hoyofiles", "files", "hk4e"])).await.unwrap();
    assert!(out.contains("hk4e@3.1"));
    assert!(out.contains("Files: 4"));
    assert!(out.contains("171.00 B"));
    assert!(out.contains("readme.txt"));
}

#[tokio::test]
async fn files_under_subdirectory() {
    let mut ctx = context();
    let out = ctx
        .execute(&parse(&["hoyofiles", "files", "hk4e", "--path", "UI/fonts"]))
        .await
        .unwrap();
    assert!(out.contains("a.ttf"));
    assert!(!out.contains("readme.txt"));

    let err = ctx
        .execute(&parse(&["hoyofiles", "files", "hk4e", "--path", "Nope"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn search_is_case_insensitive() {
    let mut ctx = context();
    let out = ctx
        .execute(&parse(&["hoyofiles", "search", "hk4e", "MD5"]))
        .await
        .unwrap();
    assert!(out.contains("Data/file.md5list"));
    assert!(out.contains("1 matches"));
}

#[tokio::test]
async fn unknown_version_is_reported() {
    let mut ctx = context();
    let err = ctx
        .execute(&parse(&["hoyofiles", "packages", "hk4e", "--version", "9.9"]))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ApiError::UnknownVersion {
            game: "hk4e".to_string(),
            version: "9.9".to_string()
        }
    );
}

#[tokio::test]
async fn preload_summarizes_each_game() {
    let mut ctx = context();
    let out = ctx
        .execute(&parse(&["hoyofiles", "preload", "hk4e", "nap", "bh3"]))
        .await
        .unwrap();
    assert!(out.contains("hk4e"));
    assert!(out.contains("bh3"));
    assert!(out.contains("HTTP 404"));
    assert!(out.contains("Some games failed to load."));
    ctx.shutdown().await;
}
