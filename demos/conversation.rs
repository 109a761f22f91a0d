//! Score a short patient conversation and print the replies and report

use cogwatch::{CareProcessor, EngineConfig};

fn main() {
    let utterances = [
        "今天天气很好，我去公园散步了",
        "我最近总是忘记东西，想不起来昨天做了什么",
        "嗯... 这是哪里？我不知道现在是几点",
        "那个东西... 我记不起来了",
    ];

    let mut config = EngineConfig::default();
    config.engine.seed = Some(42);

    let mut processor = match CareProcessor::from_config(&config) {
        Ok(processor) => processor,
        Err(e) => {
            eprintln!("Error: {e:?}");
            return;
        }
    };

    for text in utterances {
        match processor.take_turn(text) {
            Ok(turn) => println!(
                "patient: {text}\n  severity {:.2} ({}), reply: {}\n",
                turn.assessment.severity_score,
                turn.assessment.severity_category.as_str(),
                turn.response
            ),
            Err(e) => eprintln!("Error: {e:?}"),
        }
    }

    if let Some(report) = processor.report() {
        println!("{report}\n");
    }

    match serde_json::to_string_pretty(&processor.decline_indicators()) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
