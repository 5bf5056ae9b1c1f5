use serde::{Deserialize, Serialize};

/// 서명자 신원 스냅샷
///
/// 세션 생성 시점에 그대로 복사되어 저장되며, 이후 다른 곳에서
/// 서명자 정보가 바뀌어도 이미 만들어진 세션에는 영향이 없습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerInfo {
    pub email: String,
    pub name: String,
    /// 템플릿의 서명자 역할 이름. 프론트엔드는 `role_name`으로 보냅니다.
    #[serde(default = "default_role", alias = "role_name")]
    pub role: String,
    #[serde(default)]
    pub phone: Option<String>,
}

fn default_role() -> String {
    "signer".to_string()
}

impl SignerInfo {
    /// 경계 검증: 이름/이메일/전화번호 형식을 확인하고 공백을 정리한 사본을 돌려줍니다.
    ///
    /// 실패 메시지는 그대로 400 응답 본문에 실립니다.
    pub fn validate(&self) -> Result<SignerInfo, String> {
        let name = self.name.trim();
        if name.chars().count() < 2 {
            return Err("Name must be at least 2 characters long".to_string());
        }

        let email = self.email.trim();
        if !is_plausible_email(email) {
            return Err("Please enter a valid email address".to_string());
        }

        // 빈 문자열 전화번호는 "없음"으로 정규화
        let phone = self
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());
        if let Some(phone) = phone {
            let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
            if digits < 10 {
                return Err("Phone number must be at least 10 digits".to_string());
            }
        }

        let role = self.role.trim();
        if role.is_empty() {
            return Err("Signer role must not be empty".to_string());
        }
        // 역할은 제공자 폼 키 `signers[{role}][name]` 안에 들어갑니다.
        if role.contains(['[', ']']) {
            return Err("Signer role must not contain '[' or ']'".to_string());
        }

        Ok(SignerInfo {
            email: email.to_string(),
            name: name.to_string(),
            role: role.to_string(),
            phone: phone.map(str::to_string),
        })
    }
}

// local@domain.tld 형태만 확인합니다. 실제 수신 가능 여부는 제공자가 판단합니다.
fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}
