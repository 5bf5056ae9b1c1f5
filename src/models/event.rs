/// 제공자 웹훅 이벤트의 정규화된 종류
///
/// 제공자마다 이벤트 이름이 다르므로(`signature_request_all_signed`,
/// `envelope-completed` 등) 웹훅 정규화 단계에서 이 네 가지로 모읍니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    AllSigned,
    SignerSigned,
    Declined,
    Canceled,
}

/// 제공자 형식과 무관한 웹훅 이벤트
///
/// 라이프사이클 엔진은 이 타입만 보며, 제공자의 원시 페이로드 형태에 의존하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEvent {
    pub kind: EventKind,
    pub provider_request_id: String,
    /// 거절 이벤트에만 실리는 사유
    pub decline_reason: Option<String>,
}
