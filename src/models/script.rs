use serde::{Deserialize, Serialize};

/// 答卷记录（查询接口返回的对象，只关心用于匹配的字段）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptRecord {
    #[serde(alias = "id", deserialize_with = "deserialize_id")]
    pub script_id: String,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub student_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub subject_id: Option<String>,
}

impl ScriptRecord {
    /// 学生与科目是否都一致
    pub fn matches(&self, student_id: &str, subject_id: &str) -> bool {
        self.student_id.as_deref() == Some(student_id) && self.subject_id.as_deref() == Some(subject_id)
    }
}

/// 创建接口的成功响应
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedScript {
    #[serde(alias = "id", deserialize_with = "deserialize_id")]
    pub script_id: String,
}

/// 后端的ID有时是字符串有时是整数，统一成字符串
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer identifier")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "deserialize_id")] String);

    Option::<Wrapper>::deserialize(deserializer).map(|w| w.map(|Wrapper(id)| id))
}
