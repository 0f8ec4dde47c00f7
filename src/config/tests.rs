use super::*;

#[test]
fn defaults_match_documented_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert_eq!(settings.render.diagram_language, "mermaid");
    assert_eq!(settings.render.mermaid_cli_path, PathBuf::from("mmdc"));
    assert_eq!(settings.view.enhance_delay, Duration::from_millis(100));
    assert_eq!(settings.view.copy_feedback, Duration::from_millis(2000));
    assert!(settings.view.clipboard_command.is_none());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("info".to_string());
    raw.render.diagram_language = Some("mermaid".to_string());

    raw.apply_logging_overrides(&LoggingOverrides {
        log_level: Some("debug".to_string()),
        log_json: Some(true),
    });
    raw.apply_render_overrides(&RenderOverrides {
        diagram_language: Some("graph".to_string()),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert!(matches!(settings.logging.format, LogFormat::Json));
    assert_eq!(settings.render.diagram_language, "graph");
}

#[test]
fn view_overrides_apply() {
    let mut raw = RawSettings::default();
    raw.apply_view_overrides(&ViewOverrides {
        enhance_delay_ms: Some(0),
        copy_feedback_ms: Some(500),
        clipboard_command: Some("  wl-copy  ".to_string()),
    });
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.view.enhance_delay, Duration::ZERO);
    assert_eq!(settings.view.copy_feedback, Duration::from_millis(500));
    assert_eq!(settings.view.clipboard_command.as_deref(), Some("wl-copy"));
}

#[test]
fn rejects_invalid_values() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "logging.level",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.render.diagram_language = Some("mer maid".to_string());
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "render.diagram_language",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.view.copy_feedback_ms = Some(0);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "view.copy_feedback_ms",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.view.enhance_delay_ms = Some(60_000);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn blank_clipboard_command_is_ignored() {
    let mut raw = RawSettings::default();
    raw.view.clipboard_command = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.view.clipboard_command.is_none());
}

#[test]
fn parse_render_arguments() {
    let args = CliArgs::parse_from([
        "qbank-render",
        "render",
        "--json",
        "--render-diagram-language",
        "graph",
        "/tmp/solution.md",
    ]);

    match args.command {
        Command::Render(render) => {
            assert!(render.json);
            assert_eq!(render.render.diagram_language.as_deref(), Some("graph"));
            assert_eq!(render.file, std::path::Path::new("/tmp/solution.md"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_hot_arguments() {
    let args = CliArgs::parse_from([
        "qbank-render",
        "hot",
        "/tmp/questions.json",
        "--categories",
        "/tmp/categories.json",
        "--offset",
        "10",
        "--rounds",
        "3",
    ]);

    match args.command {
        Command::Hot(hot) => {
            assert_eq!(hot.questions, std::path::Path::new("/tmp/questions.json"));
            assert_eq!(
                hot.categories.as_deref(),
                Some(std::path::Path::new("/tmp/categories.json"))
            );
            assert_eq!(hot.offset, 10);
            assert_eq!(hot.rounds, 3);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn hot_rounds_must_be_positive() {
    let result = CliArgs::try_parse_from(["qbank-render", "hot", "q.json", "--rounds", "0"]);
    assert!(result.is_err());
}

#[test]
fn hot_rounds_are_capped() {
    let at_cap = MAX_HOT_ROUNDS.to_string();
    let args = CliArgs::try_parse_from(["qbank-render", "hot", "q.json", "--rounds", &at_cap])
        .expect("cap is accepted");
    assert!(matches!(args.command, Command::Hot(hot) if hot.rounds == MAX_HOT_ROUNDS));

    for rounds in ["1001", "4294967295"] {
        let result =
            CliArgs::try_parse_from(["qbank-render", "hot", "q.json", "--rounds", rounds]);
        assert!(result.is_err(), "{rounds} rounds should be rejected");
    }
}

#[test]
fn parse_preview_overrides_and_global_logging() {
    let args = CliArgs::parse_from([
        "qbank-render",
        "preview",
        "--view-enhance-delay-ms",
        "0",
        "--view-clipboard-command",
        "xclip -selection clipboard",
        "--render-mermaid-cli-path",
        "/opt/mmdc",
        "--log-level",
        "warn",
        "/tmp/solution.md",
    ]);

    assert_eq!(args.logging.log_level.as_deref(), Some("warn"));
    match args.command {
        Command::Preview(preview) => {
            assert_eq!(preview.view.enhance_delay_ms, Some(0));
            assert_eq!(
                preview.view.clipboard_command.as_deref(),
                Some("xclip -selection clipboard")
            );
            assert_eq!(
                preview.render.mermaid_cli_path.as_deref(),
                Some(std::path::Path::new("/opt/mmdc"))
            );
        }
        _ => panic!("wrong command parsed"),
    }
}
