use serde::{Deserialize, Serialize};

/// 页面间交接的班级/科目/学生选择
///
/// 全部为空等价于"未选择"，不是错误。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    /// 该科目是否已上传标准答案
    #[serde(default)]
    pub key_answer_available: bool,
}

impl SelectionContext {
    pub fn new(
        class_id: impl Into<String>,
        subject_id: impl Into<String>,
        student_id: impl Into<String>,
    ) -> Self {
        Self {
            class_id: Some(class_id.into()),
            subject_id: Some(subject_id.into()),
            student_id: Some(student_id.into()),
            key_answer_available: false,
        }
    }

    pub fn with_key_answer(mut self, available: bool) -> Self {
        self.key_answer_available = available;
        self
    }
}

/// 用户选择的源文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    /// 声明的 MIME 类型（浏览器 File.type 的对应物）
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// 是否为 PDF
    ///
    /// 有声明类型时以声明为准，否则按文件头识别。
    pub fn is_pdf(&self) -> bool {
        match self.content_type.as_deref() {
            Some(declared) => declared.eq_ignore_ascii_case("application/pdf"),
            None => infer::get(&self.bytes).is_some_and(|kind| kind.mime_type() == "application/pdf"),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_pdf_by_magic_bytes() {
        let pdf = SourceFile::new("script.pdf", b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n".to_vec());
        assert!(pdf.is_pdf());

        let png = SourceFile::new("script.pdf", vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
        assert!(!png.is_pdf());
    }

    #[test]
    fn declared_type_wins_over_content() {
        let file = SourceFile::new("notes.txt", b"%PDF-1.4".to_vec()).with_content_type("text/plain");
        assert!(!file.is_pdf());

        let file = SourceFile::new("scan", Vec::new()).with_content_type("application/PDF");
        assert!(file.is_pdf());
    }
}
