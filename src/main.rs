use clap::{Arg, ArgAction, Command};
use tankai::logging::{init_logging, level_for_verbosity, parse_log_level, LogConfig, LogOutput};
use tankai::scenario::ScenarioConfig;
use tankai::simulation::SimulationEngine;
use tracing::error;

fn main() {
    // コマンドライン引数の解析
    let matches = Command::new("tankai")
        .version(env!("CARGO_PKG_VERSION"))
        .about("自律戦車AIシミュレーション (Tank AI Simulation)")
        .long_about(
            "戦車エージェントの走行・目標追跡・弾道射撃を固定時間刻みで再現する\n\
             アリーナ戦シミュレータです。",
        )
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定"),
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(ArgAction::SetTrue)
                .requires("scenario")
                .help("シナリオの情報のみ表示して終了"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: トレース)"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベル (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("TARGET")
                .default_value("console")
                .help("ログ出力先 (console, file, both)"),
        )
        .get_matches();

    let verbose_level = matches.get_count("verbose");

    let explicit_level = match matches.get_one::<String>("log-level").map(|s| parse_log_level(s)) {
        Some(Ok(level)) => Some(level),
        Some(Err(message)) => {
            eprintln!("エラー: {}", message);
            std::process::exit(2);
        }
        None => None,
    };
    let output = match matches
        .get_one::<String>("log-output")
        .map(|s| s.parse::<LogOutput>())
        .unwrap_or(Ok(LogOutput::Console))
    {
        Ok(output) => output,
        Err(message) => {
            eprintln!("エラー: {}", message);
            std::process::exit(2);
        }
    };

    let log_config = LogConfig {
        level: level_for_verbosity(verbose_level, explicit_level),
        output,
        ..LogConfig::default()
    };
    // ファイル出力のガードはプロセス終了まで保持
    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ログ初期化エラー: {}", e);
            std::process::exit(1);
        }
    };

    println!("自律戦車AIシミュレーション - tankai v{}", env!("CARGO_PKG_VERSION"));
    println!();

    if let Some(scenario_path) = matches.get_one::<String>("scenario") {
        if let Err(e) = run_scenario(scenario_path, matches.get_flag("info"), verbose_level) {
            error!("{}", e);
            eprintln!("エラー: {}", e);
            std::process::exit(1);
        }
    } else {
        show_default_help();
    }
}

/// シナリオファイルを読み込んで実行
fn run_scenario(scenario_path: &str, info_only: bool, verbose_level: u8) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = ScenarioConfig::from_file(scenario_path)?;

    if verbose_level > 0 {
        println!("シナリオファイル読み込み完了: {}", scenario_path);
    }

    scenario.print_summary();
    if info_only {
        return Ok(());
    }
    println!();

    let mut simulation = SimulationEngine::new(scenario, verbose_level);
    simulation.initialize()?;
    let summary = simulation.run()?;

    println!();
    println!("=== 結果 ===");
    println!("経過時間: {:.2}秒 ({}ステップ)", summary.elapsed, summary.steps);
    println!(
        "発射: {}発 / 命中: {}発 / 外れ: {}発 / 補給: {}回",
        summary.stats.shots_fired, summary.stats.hits, summary.stats.misses, summary.stats.refills
    );
    for (tank_id, time) in &summary.stats.destroyed {
        println!("  撃破: {} ({:.2}秒)", tank_id, time);
    }
    for tank in &summary.tanks {
        println!(
            "  {} [{}] {:?}: 発射 {}発 (残弾 {}) / 視認 {}回",
            tank.id,
            tank.team,
            tank.status,
            tank.shots.total_shots,
            tank.shots.ammo_remaining,
            tank.detections.enter_events
        );
    }
    match &summary.winner {
        Some(team) => println!("勝者: {}", team),
        None => println!("勝者なし（時間切れまたは相打ち）"),
    }

    Ok(())
}

/// デフォルトヘルプとシナリオ一覧を表示
fn show_default_help() {
    println!("使用方法:");
    println!("  tankai [オプション]");
    println!();
    println!("オプション:");
    println!("  -s, --scenario <FILE>    シナリオファイルを指定して実行");
    println!("  -i, --info               シナリオ情報のみ表示");
    println!("  -v, --verbose            詳細出力 (複数指定で詳細レベル上昇)");
    println!("      --log-level <LEVEL>  ログレベル (RUST_LOG が優先)");
    println!("      --log-output <TARGET> ログ出力先 (console, file, both)");
    println!("  -h, --help               このヘルプを表示");
    println!();
    println!("利用可能なシナリオファイル:");
    println!("  scenarios/arena_duel.yaml       - 1対1の決闘");
    println!("  scenarios/team_skirmish.yaml    - 障害物と補給地点のあるチーム戦");
    println!();
    println!("例:");
    println!("  tankai -s scenarios/arena_duel.yaml");
    println!("  tankai -s scenarios/team_skirmish.yaml -v --log-output both");
    println!("  tankai -s scenarios/team_skirmish.yaml -i");
}
