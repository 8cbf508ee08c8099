use anyhow::bail;
use clap::Parser;
use monty::*;
use std::io::{self, BufRead, Write};
use tracing::{warn, Level};

/// 蒙提霍尔三门问题，终端版
#[derive(Debug, Parser)]
#[command(name = "monty", version, about)]
struct Args {
    /// 门数
    #[arg(short, long, default_value_t = MIN_DOORS)]
    doors: u32,

    /// 随机数种子
    #[arg(short, long)]
    seed: Option<u64>,

    /// 以 JSON 行输出状态快照
    #[arg(long)]
    json: bool,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn settings(&self) -> Settings {
        Settings::new(self.doors, self.seed)
    }
}

/// 挑战者输入的指令，门号从 1 开始，解析后转为从 0 开始的序号
#[derive(Debug, PartialEq)]
enum Command {
    Select(u32),
    Random,
    Stay,
    Switch(Option<u32>),
    Reset(Option<u32>),
    Help,
    Quit,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(if args.verbose {
            Level::DEBUG
        } else {
            Level::WARN
        })
        .init();

    let mut engine = GameEngine::from_settings(args.settings())?;

    // 界面只通过订阅拿到快照
    let json = args.json;
    let show = move |snapshot: &Snapshot| {
        if json {
            match serde_json::to_string(snapshot) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!("Failed to encode snapshot: {e}"),
            }
        } else {
            println!("{}", render(snapshot));
        }
    };
    show(&engine.snapshot());
    engine.subscribe(show);

    prompt(json)?;
    for line in io::stdin().lock().lines() {
        let command = match parse_command(&line?) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{e}");
                prompt(json)?;
                continue;
            }
        };

        let result = match command {
            Command::Select(index) => engine.select_door(index),
            Command::Random => engine.select_random().map(|_| ()),
            Command::Stay => engine.resolve(Decision::Stay).map(|_| ()),
            Command::Switch(None) => engine.resolve(Decision::Switch).map(|_| ()),
            Command::Switch(Some(index)) => engine.switch_to(index).map(|_| ()),
            Command::Reset(doors) => engine.reset(doors.unwrap_or(engine.doors())),
            Command::Help => {
                print_usage();
                Ok(())
            }
            Command::Quit => break,
        };

        if let Err(e) = result {
            eprintln!("{}", describe(&e));
        }
        prompt(json)?;
    }

    Ok(())
}

fn prompt(json: bool) -> io::Result<()> {
    if !json {
        print!("> ");
        io::stdout().flush()?;
    }
    Ok(())
}

fn parse_command(line: &str) -> anyhow::Result<Command> {
    let mut words = line.split_whitespace();
    let command = match (words.next(), words.next()) {
        (None, _) => Command::Help,
        (Some("r" | "random"), None) => Command::Random,
        (Some("stay"), None) => Command::Stay,
        (Some("switch"), door) => Command::Switch(door.map(parse_door).transpose()?),
        (Some("reset"), doors) => Command::Reset(doors.map(str::parse).transpose()?),
        (Some("h" | "help"), None) => Command::Help,
        (Some("q" | "quit"), None) => Command::Quit,
        (Some(door), None) => Command::Select(parse_door(door)?),
        (Some(word), Some(_)) => bail!("无法识别的指令: {word}"),
    };

    if words.next().is_some() {
        bail!("参数过多: {line}");
    }
    Ok(command)
}

fn parse_door(word: &str) -> anyhow::Result<u32> {
    match word.parse::<u32>() {
        Ok(door) if door > 0 => Ok(door - 1),
        _ => bail!("无效的门号: {word}"),
    }
}

fn describe(error: &Error) -> String {
    match error {
        Error::InvalidState => "当前阶段不能进行该操作".to_string(),
        Error::OutOfRange { index, doors } => {
            format!("没有 {} 号门，共 {} 个门", index + 1, doors)
        }
        Error::TooFewDoors { doors } => format!("至少需要 {MIN_DOORS} 个门，而不是 {doors} 个"),
        Error::AmbiguousSwitch { .. } => "门数多于三个，请用 switch <门号> 指定改选的门".to_string(),
        Error::InvalidSwitchTarget { index } => format!("不能改选 {} 号门", index + 1),
    }
}

fn render(snapshot: &Snapshot) -> String {
    let doors: Vec<String> = (0..snapshot.doors)
        .map(|door| {
            let number = door + 1;
            if snapshot.prize == Some(door) {
                format!("[{number}:🏆]")
            } else if snapshot.phase == Phase::End || snapshot.revealed == Some(door) {
                format!("[{number}:🦆]")
            } else if snapshot.selected == Some(door) {
                format!("<{number}>")
            } else {
                format!("[{number}]")
            }
        })
        .collect();

    let message = match snapshot.phase {
        Phase::Start => "请选择一扇门（输入门号，r 随机选择）".to_string(),
        Phase::Decision => {
            let selected = snapshot.selected.map_or(0, |door| door + 1);
            if snapshot.doors == MIN_DOORS {
                format!("坚持选择 {selected} 号门（stay）还是改选另一扇门（switch）？")
            } else {
                format!("坚持选择 {selected} 号门（stay）还是改选（switch <门号>）？")
            }
        }
        Phase::End => format!(
            "{} 输入 reset [门数] 再来一局",
            snapshot.outcome.message()
        ),
    };

    format!("{}\n{}", doors.join(" "), message)
}

fn print_usage() {
    println!(
        "指令:\n\
         \x20 <门号>            选择一扇门\n\
         \x20 r | random        随机选择一扇门\n\
         \x20 stay              坚持选择\n\
         \x20 switch [门号]     改选，多于三个门时需指定门号\n\
         \x20 reset [门数]      重新开始一局\n\
         \x20 q | quit          退出"
    );
}
