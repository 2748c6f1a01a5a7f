use crate::config::ProvisioningConfig;
use crate::nginx::{self, Block, Config, Directive};
use crate::systemd::{Bind, SupervisorDescriptor};

const HEADER: &str = "Managed by trebuchet. Changes are overwritten on re-run.";

/// Token bucket keyed by client address.
///
/// Lives in its own `conf.d` file so it is loaded before any site
/// that references it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitZone {
    pub name: String,
    pub requests_per_sec: u32,
    pub size_mb: u32,
}

impl RateLimitZone {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            requests_per_sec: 30,
            size_mb: 10,
        }
    }

    #[must_use]
    pub fn directive(&self) -> Directive {
        Directive::new("limit_req_zone")
            .arg("$binary_remote_addr")
            .arg(format!("zone={}:{}m", self.name, self.size_mb))
            .arg(format!("rate={}r/s", self.requests_per_sec))
    }

    #[must_use]
    pub fn render(&self) -> String {
        nginx::format(&Config::new().comment(HEADER).directive(self.directive()))
    }
}

/// Upstream timeouts for the default path class, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyTimeouts {
    pub connect: u32,
    pub send: u32,
    pub read: u32,
}

impl Default for ProxyTimeouts {
    fn default() -> Self {
        Self {
            connect: 10,
            send: 30,
            read: 30,
        }
    }
}

/// The nginx site routing external traffic to the supervised
/// process.
///
/// The upstream can only come from a [`SupervisorDescriptor`], so
/// the proxy target always matches the port the service binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySite {
    pub server_name: String,
    pub listen: Vec<u16>,
    upstream: Bind,
    pub zone: RateLimitZone,
    pub auth_prefix: String,
    pub auth_burst: u32,
    pub static_extensions: Vec<String>,
    pub static_cache_days: u32,
    pub timeouts: ProxyTimeouts,
    pub max_body_size: String,
}

impl ProxySite {
    #[must_use]
    pub fn for_service(config: &ProvisioningConfig, service: &SupervisorDescriptor) -> Self {
        Self {
            server_name: config.proxy_server_name(),
            listen: vec![80],
            upstream: service.bind,
            zone: RateLimitZone::new(&format!("{}_auth", config.app_user().replace('-', "_"))),
            auth_prefix: "/api/auth/".to_string(),
            auth_burst: 10,
            static_extensions: ["css", "js", "png", "jpg", "jpeg", "gif", "ico", "svg", "webp", "woff", "woff2"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            static_cache_days: 7,
            timeouts: ProxyTimeouts::default(),
            max_body_size: "10M".to_string(),
        }
    }

    #[must_use]
    pub const fn upstream(&self) -> Bind {
        self.upstream
    }

    /// Build the typed `server` block.
    #[must_use]
    pub fn server_block(&self) -> Block {
        let mut server = Block::new("server");
        for port in &self.listen {
            server = server
                .set("listen", &[&port.to_string()])
                .set("listen", &[&format!("[::]:{port}")]);
        }
        server = server
            .set("server_name", &[&self.server_name])
            .blank()
            .set("client_max_body_size", &[&self.max_body_size])
            .blank();

        // `^~` keeps the static-suffix regex from stealing auth
        // requests, so every auth call is rate limited.
        let auth = self.forwarded(Block::new("location").arg("^~").arg(self.auth_prefix.clone()))
            .directive(
                Directive::new("limit_req")
                    .arg(format!("zone={}", self.zone.name))
                    .arg(format!("burst={}", self.auth_burst))
                    .arg("nodelay"),
            )
            .set("limit_req_status", &["429"]);

        let suffixes = self.static_extensions.join("|");
        let assets = self
            .forwarded(Block::new("location").arg("~*").arg(format!("\\.(?:{suffixes})$")))
            .set("expires", &[&format!("{}d", self.static_cache_days)])
            .set("add_header", &["Cache-Control", "\"public, immutable\""]);

        let default = self
            .forwarded(Block::new("location").arg("/"))
            .set("proxy_connect_timeout", &[&format!("{}s", self.timeouts.connect)])
            .set("proxy_send_timeout", &[&format!("{}s", self.timeouts.send)])
            .set("proxy_read_timeout", &[&format!("{}s", self.timeouts.read)]);

        server.block(auth).blank().block(assets).blank().block(default)
    }

    #[must_use]
    pub fn render(&self) -> String {
        nginx::format(&Config::new().comment(HEADER).block(self.server_block()))
    }

    fn forwarded(&self, location: Block) -> Block {
        location
            .set("proxy_pass", &[&self.upstream.url()])
            .set("proxy_http_version", &["1.1"])
            .set("proxy_set_header", &["Host", "$host"])
            .set("proxy_set_header", &["X-Real-IP", "$remote_addr"])
            .set("proxy_set_header", &["X-Forwarded-For", "$proxy_add_x_forwarded_for"])
            .set("proxy_set_header", &["X-Forwarded-Proto", "$scheme"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Domain, Settings};

    fn site(domain: &str) -> ProxySite {
        let config = ProvisioningConfig::new(
            Settings::default().repo_url("https://git.example.org/hoops.git"),
            Domain::parse(domain).unwrap(),
            false,
            None,
            Some("203.0.113.7"),
        );
        ProxySite::for_service(&config, &SupervisorDescriptor::for_config(&config))
    }

    #[test]
    fn zone_line() {
        let zone = RateLimitZone::new("hoops_auth");

        assert!(zone.render().contains(
            "limit_req_zone $binary_remote_addr zone=hoops_auth:10m rate=30r/s;"
        ));
    }

    #[test]
    fn unset_domain_matches_any_host() {
        assert!(site("").render().contains("server_name _;"));
    }

    #[test]
    fn three_path_classes() {
        let server = site("example.org").server_block();
        let locations: Vec<_> = server.blocks("location").collect();

        assert_eq!(locations.len(), 3);
        assert_eq!(locations[0].args, vec!["^~", "/api/auth/"]);
        assert_eq!(locations[1].args[0], "~*");
        assert_eq!(locations[2].args, vec!["/"]);
    }

    #[test]
    fn auth_class_is_rate_limited_without_delay() {
        let rendered = site("example.org").render();

        assert!(rendered.contains("limit_req zone=hoops_auth burst=10 nodelay;"));
    }

    #[test]
    fn assets_cached_immutable() {
        let rendered = site("example.org").render();

        assert!(rendered.contains("expires 7d;"));
        assert!(rendered.contains("add_header Cache-Control \"public, immutable\";"));
    }

    #[test]
    fn default_class_timeouts_and_headers() {
        let server = site("example.org").server_block();
        let default = server.blocks("location").last().unwrap();

        assert_eq!(default.find("proxy_connect_timeout").unwrap().args, vec!["10s"]);
        assert_eq!(default.find("proxy_send_timeout").unwrap().args, vec!["30s"]);
        assert_eq!(default.find("proxy_read_timeout").unwrap().args, vec!["30s"]);
        assert_eq!(default.find("proxy_pass").unwrap().args, vec!["http://127.0.0.1:8000"]);
    }

    #[test]
    fn upstream_follows_service_bind() {
        let config = ProvisioningConfig::new(
            Settings::default().repo_url("r"),
            Domain::Unset,
            false,
            None,
            Some("203.0.113.7"),
        );
        let mut service = SupervisorDescriptor::for_config(&config);
        service.bind.port = 9000;

        let site = ProxySite::for_service(&config, &service);

        assert_eq!(site.upstream().port, 9000);
        assert!(site.render().contains("proxy_pass http://127.0.0.1:9000;"));
    }
}
