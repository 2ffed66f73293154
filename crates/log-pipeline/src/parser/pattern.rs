//! 템플릿 패턴 컴파일러
//!
//! 설정 항목 `"<keyword> ~ <template>"` 하나를 [`TemplatePattern`]으로 컴파일합니다.
//! 템플릿은 공백 기준으로 나뉘며, 단어 수가 곧 패턴의 arity입니다.

use catcher_core::error::ParseError;
use catcher_core::event::{Event, EventKind};

use super::extract;
use super::field::{FieldMatch, TemplateField};
use super::vocabulary::Vocabulary;
use crate::error::LogPipelineError;

/// 키워드와 템플릿 본문 사이 구분자
pub const KEYWORD_DELIMITER: &str = " ~ ";

/// 컴파일된 템플릿 패턴
#[derive(Debug, Clone)]
pub struct TemplatePattern {
    kind: EventKind,
    fields: Vec<TemplateField>,
}

impl TemplatePattern {
    /// 설정 항목 하나를 컴파일합니다.
    pub fn compile(entry: &str, vocabulary: &Vocabulary) -> Result<Self, LogPipelineError> {
        let invalid = |reason: String| LogPipelineError::Template {
            template: entry.to_owned(),
            reason,
        };

        let (keyword, template) = entry
            .split_once(KEYWORD_DELIMITER)
            .ok_or_else(|| invalid(format!("missing '{}' delimiter", KEYWORD_DELIMITER.trim())))?;

        let keyword = keyword.trim();
        let kind = vocabulary.event_kind(keyword).ok_or_else(|| {
            invalid(format!(
                "unknown event keyword '{keyword}' (expected one of: {})",
                vocabulary.keywords().collect::<Vec<_>>().join(", ")
            ))
        })?;

        let fields: Vec<TemplateField> = template
            .split_whitespace()
            .map(|word| vocabulary.compile_word(word))
            .collect();
        if fields.is_empty() {
            return Err(invalid("template has no fields".to_owned()));
        }

        Ok(Self { kind, fields })
    }

    /// 생성할 이벤트 종류
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// 필드 수
    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    /// 컴파일된 필드 목록
    pub fn fields(&self) -> &[TemplateField] {
        &self.fields
    }

    /// 토큰 목록을 이 패턴에 대입합니다.
    ///
    /// - `Ok(None)`: 리터럴 불일치 (다음 후보를 시도해야 함)
    /// - `Ok(Some(event))`: 모든 필드 일치
    /// - `Err(MalformedField)`: 플레이스홀더 추출 실패, 파싱 전체 중단
    ///
    /// 필드는 앞에서부터 순서대로 검사되므로, 앞선 플레이스홀더의 추출 실패가
    /// 뒤쪽 리터럴 불일치보다 먼저 보고됩니다.
    pub fn match_tokens(&self, tokens: &[&str]) -> Result<Option<Event>, ParseError> {
        if tokens.len() != self.fields.len() {
            return Ok(None);
        }

        let mut event = Event::new(self.kind);
        for (field, token) in self.fields.iter().zip(tokens) {
            match field.classify(token) {
                FieldMatch::NoMatch => return Ok(None),
                FieldMatch::Literal => {}
                FieldMatch::Placeholder(placeholder) => {
                    extract::apply(placeholder, token, &mut event)?;
                }
            }
        }
        Ok(Some(event))
    }
}
