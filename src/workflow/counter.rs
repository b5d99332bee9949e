/// 账单文件全局计数器
///
/// 跨页共享，从 1 开始；只有下载成功时才前进。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementCounter {
    next: usize,
}

impl StatementCounter {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// 下一个文件使用的编号
    pub fn current(&self) -> usize {
        self.next
    }

    /// 记录一次成功下载
    pub fn advance(&mut self) {
        self.next += 1;
    }

    /// 已成功写入的文件数
    pub fn written(&self) -> usize {
        self.next - 1
    }
}

impl Default for StatementCounter {
    fn default() -> Self {
        Self::new()
    }
}
