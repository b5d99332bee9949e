/// 将地址转换为可用作文件名的片段
///
/// 空格替换为下划线，路径分隔符等非法字符同样替换，避免写出下载目录
pub fn sanitize_file_stem(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// 分页账单文件名：`statement_<n>.<ext>`
pub fn statement_file_name(index: usize, extension: &str) -> String {
    format!("statement_{}.{}", index, extension)
}

/// 单个账户最新账单文件名：`<地址>_latest_bill_<k>.<ext>`
pub fn bill_file_name(address: &str, position: usize, extension: &str) -> String {
    format!(
        "{}_latest_bill_{}.{}",
        sanitize_file_stem(address),
        position,
        extension
    )
}
