#![no_main]

use std::sync::LazyLock;

use catcher_core::config::default_templates;
use catcher_log_pipeline::TemplateParser;
use libfuzzer_sys::fuzz_target;

static PARSER: LazyLock<Option<TemplateParser>> =
    LazyLock::new(|| TemplateParser::new(&default_templates()).ok());

fuzz_target!(|data: &[u8]| {
    let Some(parser) = PARSER.as_ref() else {
        return;
    };
    let line = String::from_utf8_lossy(data);

    // 크래시나 패닉 없이 Ok 또는 Err을 반환해야 한다
    let _ = parser.parse(&line);
});
