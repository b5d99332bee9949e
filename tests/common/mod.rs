//! 测试用的内存页面实现
//!
//! 页面由若干"屏幕"组成，点击元素可以切换屏幕或触发下载。
//! 节点通过声明自己响应哪些 CSS 规则来参与匹配。

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use portal_harvest::{BrowserLauncher, Config, DownloadedFile, PageClient, Selector};

/// 点击行为
#[derive(Debug, Clone)]
pub enum Action {
    /// 切换到指定屏幕
    GoTo(usize),
    /// 触发下载
    Download { name: String, bytes: Vec<u8> },
    /// 下载失败
    FailDownload(String),
    /// 点击本身出错
    Fail(String),
}

/// 页面节点
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub css: Vec<String>,
    pub text: String,
    pub attrs: HashMap<String, String>,
    pub hidden: bool,
    pub children: Vec<Node>,
    pub on_click: Option<Action>,
}

impl Node {
    pub fn new(css: &[&str]) -> Self {
        Self {
            css: css.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn on_click(mut self, action: Action) -> Self {
        self.on_click = Some(action);
        self
    }

    fn inner_text(&self) -> String {
        let mut parts = Vec::new();
        if !self.text.is_empty() {
            parts.push(self.text.clone());
        }
        for child in &self.children {
            let text = child.inner_text();
            if !text.is_empty() {
                parts.push(text);
            }
        }
        parts.join("\n")
    }

    fn matches(&self, selector: &Selector) -> bool {
        self.css.iter().any(|c| c == &selector.css) && selector.accepts_text(&self.inner_text())
    }
}

/// 元素句柄：所在屏幕 + 从根节点出发的子节点下标路径
#[derive(Debug, Clone)]
pub struct FakeElement {
    screen: usize,
    path: Vec<usize>,
}

/// 内存页面
pub struct FakePage {
    screens: Vec<Node>,
    current: Mutex<usize>,
    fills: Mutex<Vec<(String, String)>>,
    waits: Mutex<Vec<(Selector, Duration)>>,
    staging: PathBuf,
    download_seq: AtomicUsize,
    closed: Arc<AtomicBool>,
    settle_fails: bool,
}

impl FakePage {
    pub fn new(screens: Vec<Node>, staging: &Path) -> Self {
        std::fs::create_dir_all(staging).unwrap();
        Self {
            screens,
            current: Mutex::new(0),
            fills: Mutex::new(Vec::new()),
            waits: Mutex::new(Vec::new()),
            staging: staging.to_path_buf(),
            download_seq: AtomicUsize::new(0),
            closed: Arc::new(AtomicBool::new(false)),
            settle_fails: false,
        }
    }

    /// 从指定屏幕开始（跳过登录）
    pub fn starting_at(self, screen: usize) -> Self {
        *self.current.lock().unwrap() = screen;
        self
    }

    /// 翻页后的等待总是失败
    pub fn with_failing_settle(mut self) -> Self {
        self.settle_fails = true;
        self
    }

    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }

    pub fn current_screen(&self) -> usize {
        *self.current.lock().unwrap()
    }

    /// 所有 fill 调用：(元素匹配的第一条 CSS, 填入的值)
    pub fn filled(&self) -> Vec<(String, String)> {
        self.fills.lock().unwrap().clone()
    }

    /// 所有 wait_for 调用：(匹配规则, 时限)
    pub fn waits(&self) -> Vec<(Selector, Duration)> {
        self.waits.lock().unwrap().clone()
    }

    fn resolve(&self, element: &FakeElement) -> Result<&Node> {
        let mut node = self
            .screens
            .get(element.screen)
            .ok_or_else(|| anyhow!("屏幕 {} 不存在", element.screen))?;
        for &idx in &element.path {
            node = node
                .children
                .get(idx)
                .ok_or_else(|| anyhow!("元素已失效"))?;
        }
        Ok(node)
    }

    fn collect(node: &Node, path: &mut Vec<usize>, selector: &Selector, out: &mut Vec<Vec<usize>>) {
        for (idx, child) in node.children.iter().enumerate() {
            path.push(idx);
            if child.matches(selector) {
                out.push(path.clone());
            }
            Self::collect(child, path, selector, out);
            path.pop();
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            bail!("页面已关闭");
        }
        Ok(())
    }
}

#[async_trait]
impl PageClient for FakePage {
    type Element = FakeElement;

    async fn navigate(&self, _url: &str, _timeout: Duration) -> Result<()> {
        self.ensure_open()
    }

    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> Result<FakeElement> {
        self.waits.lock().unwrap().push((selector.clone(), timeout));
        for element in self.locate_all(None, selector).await? {
            if self.is_visible(&element).await? {
                return Ok(element);
            }
        }
        bail!("等待元素 {} 超时 ({:?})", selector, timeout)
    }

    async fn locate_all(
        &self,
        scope: Option<&FakeElement>,
        selector: &Selector,
    ) -> Result<Vec<FakeElement>> {
        self.ensure_open()?;
        let (screen, base_path) = match scope {
            Some(el) => (el.screen, el.path.clone()),
            None => (self.current_screen(), Vec::new()),
        };
        let root = self.resolve(&FakeElement {
            screen,
            path: base_path.clone(),
        })?;

        let mut found = Vec::new();
        let mut path = base_path;
        Self::collect(root, &mut path, selector, &mut found);
        Ok(found
            .into_iter()
            .map(|path| FakeElement { screen, path })
            .collect())
    }

    async fn read_text(&self, element: &FakeElement) -> Result<String> {
        Ok(self.resolve(element)?.inner_text())
    }

    async fn read_attribute(&self, element: &FakeElement, name: &str) -> Result<Option<String>> {
        Ok(self.resolve(element)?.attrs.get(name).cloned())
    }

    async fn click(&self, element: &FakeElement) -> Result<()> {
        self.ensure_open()?;
        match self.resolve(element)?.on_click.clone() {
            Some(Action::GoTo(screen)) => {
                *self.current.lock().unwrap() = screen;
                Ok(())
            }
            Some(Action::Fail(msg)) => bail!(msg),
            _ => Ok(()),
        }
    }

    async fn fill(&self, element: &FakeElement, value: &str) -> Result<()> {
        let node = self.resolve(element)?;
        let css = node.css.first().cloned().unwrap_or_default();
        self.fills.lock().unwrap().push((css, value.to_string()));
        Ok(())
    }

    async fn expect_download(
        &self,
        trigger: &FakeElement,
        _timeout: Duration,
    ) -> Result<DownloadedFile> {
        self.ensure_open()?;
        match self.resolve(trigger)?.on_click.clone() {
            Some(Action::Download { name, bytes }) => {
                let seq = self.download_seq.fetch_add(1, Ordering::SeqCst);
                let staged = self.staging.join(format!("{}-{}", seq, name));
                tokio::fs::write(&staged, bytes).await?;
                Ok(DownloadedFile::new(staged, name))
            }
            Some(Action::FailDownload(msg)) => bail!(msg),
            _ => bail!("点击后没有触发下载"),
        }
    }

    async fn is_visible(&self, element: &FakeElement) -> Result<bool> {
        Ok(!self.resolve(element)?.hidden)
    }

    async fn wait_until_settled(&self, timeout: Duration) -> Result<()> {
        if self.settle_fails {
            bail!("页面在 {:?} 内未进入空闲状态", timeout);
        }
        Ok(())
    }

    async fn title(&self) -> Result<String> {
        let screen = self.current_screen();
        Ok(self.screens[screen]
            .attrs
            .get("title")
            .cloned()
            .unwrap_or_default())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// 只能启动一次的浏览器
pub struct FakeLauncher {
    page: Mutex<Option<FakePage>>,
    closed: Arc<AtomicBool>,
}

impl FakeLauncher {
    pub fn new(page: FakePage) -> Self {
        let closed = page.closed_flag();
        Self {
            page: Mutex::new(Some(page)),
            closed,
        }
    }

    /// 浏览器是否已被关闭
    pub fn browser_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    type Page = FakePage;

    async fn launch(&self, _headless: bool) -> Result<FakePage> {
        self.page
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| anyhow!("浏览器已启动过"))
    }
}

// ========== 门户页面构造 ==========

pub const LANDING: usize = 0;
pub const LOGIN_FORM: usize = 1;
pub const MFA_FORM: usize = 2;
pub const DASHBOARD: usize = 3;

pub const DASHBOARD_TITLE: &str = "PowerCo - Customer Dashboard";

/// 账户卡片的字段
#[derive(Debug, Clone)]
pub struct CardSpec {
    pub address: &'static str,
    pub account_number: &'static str,
    pub balance: &'static str,
    pub due_date: Option<&'static str>,
    pub usage: &'static str,
    pub bill: Option<Action>,
}

impl CardSpec {
    pub fn main_street() -> Self {
        Self {
            address: "123 Main Street",
            account_number: "1234-5678",
            balance: "$120.50",
            due_date: Some("Jan 15, 2025"),
            usage: "450 kWh",
            bill: Some(pdf("main-street-bill.pdf")),
        }
    }

    pub fn oak_avenue() -> Self {
        Self {
            address: "456 Oak Avenue",
            account_number: "8765-4321",
            balance: "$89.99",
            due_date: Some("Feb 1, 2025"),
            usage: "  Last Month Usage:  320 kWh ",
            bill: Some(pdf("oak-avenue-bill.pdf")),
        }
    }

    pub fn without_due_date(mut self) -> Self {
        self.due_date = None;
        self
    }

    pub fn node(&self) -> Node {
        let mut card = Node::new(&[":scope > div.bg-white"])
            .child(Node::new(&["h3.text-xl.font-semibold"]).text(self.address))
            .child(Node::new(&["p"]).text(&format!("Account #: {}", self.account_number)))
            .child(Node::new(&["span.font-semibold", "span"]).text(self.balance));
        if let Some(due) = self.due_date {
            card = card.child(Node::new(&["span"]).text(due));
        }
        card = card.child(Node::new(&["span"]).text(self.usage));

        let mut link = Node::new(&["a.bg-blue-600", "a"])
            .text("Latest Bill")
            .attr("href", &format!("/bills/{}.pdf", self.account_number));
        if let Some(action) = &self.bill {
            link = link.on_click(action.clone());
        }
        card.child(link)
    }
}

pub fn pdf(name: &str) -> Action {
    Action::Download {
        name: name.to_string(),
        bytes: b"%PDF-1.4".to_vec(),
    }
}

/// 账单列表中的一页
#[derive(Debug, Clone, Default)]
pub struct StatementPage {
    pub links: Vec<Action>,
    /// 下一页按钮：None 表示没有按钮
    pub next: Option<Node>,
}

impl StatementPage {
    pub fn with_pdfs(count: usize) -> Self {
        Self {
            links: (0..count).map(|_| pdf("statement.pdf")).collect(),
            next: None,
        }
    }
}

/// "下一页"按钮
pub fn next_button(action: Action) -> Node {
    Node::new(&["a"]).text("Next").on_click(action)
}

fn dashboard(cards: &[CardSpec], statements: &StatementPage) -> Node {
    let mut table = Node::new(&["table"]);
    for action in &statements.links {
        table = table.child(
            Node::new(&["tr"]).child(
                Node::new(&["td"]).child(
                    Node::new(&["tr td a.text-blue-600", "a"])
                        .text("Download")
                        .on_click(action.clone()),
                ),
            ),
        );
    }

    let mut root = Node::new(&["html"])
        .attr("title", DASHBOARD_TITLE)
        .child(Node::new(&["h2"]).text("PowerCo Dashboard"))
        .child(Node::new(&["div.grid.gap-6.mb-8"]).children(cards.iter().map(CardSpec::node)))
        .child(table);
    if let Some(next) = &statements.next {
        root = root.child(next.clone());
    }
    root
}

/// 登录相关屏幕
pub fn login_screens(with_mfa_input: bool, with_dashboard_marker: bool) -> Vec<Node> {
    let landing = Node::new(&["html"])
        .attr("title", "PowerCo")
        .child(Node::new(&["a"]).text("Try 2FA Login").on_click(Action::GoTo(LOGIN_FORM)));

    let login_form = Node::new(&["html"])
        .attr("title", "PowerCo - Login")
        .child(Node::new(&["button.btn-allow"]).text("Allow all cookies"))
        .child(Node::new(&["input[name='username']"]))
        .child(Node::new(&["input[name='password']"]))
        .child(
            Node::new(&["button[type='submit']"])
                .text("Log in")
                .on_click(Action::GoTo(MFA_FORM)),
        );

    let mut mfa_form = Node::new(&["html"]).attr("title", "PowerCo - Verify");
    if with_mfa_input {
        mfa_form = mfa_form.child(Node::new(&["input#mfa_code"]));
    }
    let target = if with_dashboard_marker { DASHBOARD } else { MFA_FORM };
    mfa_form = mfa_form.child(
        Node::new(&["button[type='submit']"])
            .text("Verify")
            .on_click(Action::GoTo(target)),
    );

    vec![landing, login_form, mfa_form]
}

/// 完整门户：登录屏幕 + 若干仪表盘页（卡片只在第一页）
///
/// 各页"下一页"按钮默认指向下一屏幕，最后一页没有按钮
pub fn portal(cards: &[CardSpec], pages: Vec<StatementPage>) -> Vec<Node> {
    let mut screens = login_screens(true, true);
    let total = pages.len();
    for (idx, mut page) in pages.into_iter().enumerate() {
        if page.next.is_none() && idx + 1 < total {
            page.next = Some(next_button(Action::GoTo(DASHBOARD + idx + 1)));
        }
        let page_cards: &[CardSpec] = if idx == 0 { cards } else { &[] };
        screens.push(dashboard(page_cards, &page));
    }
    screens
}

/// 测试配置
pub fn test_config(root: &Path) -> Config {
    let root = root.to_path_buf();
    Config::from_lookup(move |name| match name {
        "BASE_URL" => Some("https://powerco.example".to_string()),
        "USERNAME" => Some("alice".to_string()),
        "PASSWORD" => Some("hunter2".to_string()),
        "MFA_CODE" => Some("246810".to_string()),
        "TIMEOUT" => Some("1".to_string()),
        "MFA_TIMEOUT" => Some("5".to_string()),
        "OPTIONAL_STEP_TIMEOUT" => Some("2".to_string()),
        "DOWNLOAD_DIR" => Some(root.join("downloads").display().to_string()),
        "OUTPUT_FILE" => Some(root.join("extracted_accounts.json").display().to_string()),
        "DIAGNOSTICS_FILE" => Some(root.join("failures.txt").display().to_string()),
        _ => None,
    })
    .unwrap()
}
