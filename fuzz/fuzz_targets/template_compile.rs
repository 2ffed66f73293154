#![no_main]

use arbitrary::Arbitrary;
use catcher_log_pipeline::TemplateParser;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    templates: Vec<String>,
    lines: Vec<String>,
}

fuzz_target!(|input: Input| {
    // 임의 템플릿은 컴파일에 실패할 수 있지만, 성공했다면 어떤 라인도 패닉 없이 처리해야 한다
    if let Ok(parser) = TemplateParser::new(&input.templates) {
        for line in &input.lines {
            let _ = parser.parse(line);
        }
    }
});
