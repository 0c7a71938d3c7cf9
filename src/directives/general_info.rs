//! Document-level directives (`@title`, `@host`, `@securityDefinitions.*`, ...).

use crate::openapi::{Contact, Document, ExternalDocs, License, SecurityScheme, Server, Tag};
use log::trace;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

type Handler = fn(&mut GeneralInfoProcessor<'_>, &Captures<'_>);

struct Directive {
    name: &'static str,
    pattern: Regex,
    handler: Handler,
}

fn directive(name: &'static str, pattern: &str, handler: Handler) -> Directive {
    Directive {
        name,
        pattern: Regex::new(pattern).expect("directive pattern is valid"),
        handler,
    }
}

static DIRECTIVES: Lazy<Vec<Directive>> = Lazy::new(|| {
    vec![
        directive("title", r"^@title\s+(.+)$", |p, c| p.document.info.title = text(c, 1)),
        directive("version", r"^@version\s+(.+)$", |p, c| p.document.info.version = text(c, 1)),
        directive("description", r"^@description\s+(.+)$", |p, c| p.description(c)),
        directive("summary", r"^@summary\s+(.+)$", |p, c| p.document.info.summary = Some(text(c, 1))),
        directive("termsOfService", r"^@termsOfService\s+(.+)$", |p, c| {
            p.document.info.terms_of_service = Some(text(c, 1))
        }),
        directive("contact.name", r"^@contact\.name\s+(.+)$", |p, c| p.contact().name = Some(text(c, 1))),
        directive("contact.url", r"^@contact\.url\s+(.+)$", |p, c| p.contact().url = Some(text(c, 1))),
        directive("contact.email", r"^@contact\.email\s+(.+)$", |p, c| {
            p.contact().email = Some(text(c, 1))
        }),
        directive("license.name", r"^@license\.name\s+(.+)$", |p, c| p.license().name = text(c, 1)),
        directive("license.url", r"^@license\.url\s+(.+)$", |p, c| p.license().url = Some(text(c, 1))),
        directive("license.identifier", r"^@license\.identifier\s+(.+)$", |p, c| {
            p.license().identifier = Some(text(c, 1))
        }),
        directive("host", r"^@host\s+(\S+)$", |p, c| p.host(c)),
        directive("basePath", r"^@basePath\s+(\S+)$", |p, c| p.base_path(c)),
        directive("schemes", r"^@schemes\s+(.+)$", |p, c| p.schemes(c)),
        directive("server.description", r"^@server\.description\s+(.+)$", |p, c| {
            if let Some(server) = p.document.servers.last_mut() {
                server.description = Some(text(c, 1));
            }
        }),
        directive("server", r"^@server\s+(\S+)\s*(.*)$", |p, c| {
            p.document.servers.push(Server {
                url: text(c, 1),
                description: optional(c, 2),
            })
        }),
        directive("tag.name", r"^@tag\.name\s+(.+)$", |p, c| p.tag_name(c)),
        directive("tag.description", r"^@tag\.description\s+(.+)$", |p, c| {
            if let Some(tag) = p.last_tag() {
                tag.description = Some(text(c, 1));
            }
        }),
        directive("tag.docs.url", r"^@tag\.docs\.url\s+(\S+)$", |p, c| {
            if let Some(tag) = p.last_tag() {
                tag.external_docs.get_or_insert_with(ExternalDocs::default).url = text(c, 1);
            }
        }),
        directive("tag.docs.description", r"^@tag\.docs\.description\s+(.+)$", |p, c| {
            if let Some(tag) = p.last_tag() {
                tag.external_docs.get_or_insert_with(ExternalDocs::default).description = Some(text(c, 1));
            }
        }),
        directive("externalDocs.url", r"^@externalDocs\.url\s+(\S+)$", |p, c| {
            p.external_docs().url = text(c, 1)
        }),
        directive("externalDocs.description", r"^@externalDocs\.description\s+(.+)$", |p, c| {
            p.external_docs().description = Some(text(c, 1))
        }),
        directive(
            "securityDefinitions.basic",
            r"^@securityDefinitions\.basic\s+(\S+)\s*(.*)$",
            |p, c| p.basic_auth(c),
        ),
        directive(
            "securityDefinitions.apikey",
            r"^@securityDefinitions\.apikey\s+(\S+)\s+(\S+)\s+(\w+)\s*(.*)$",
            |p, c| p.api_key(c),
        ),
    ]
});

fn text(caps: &Captures<'_>, index: usize) -> String {
    caps.get(index).map(|m| m.as_str().trim().to_string()).unwrap_or_default()
}

fn optional(caps: &Captures<'_>, index: usize) -> Option<String> {
    Some(text(caps, index)).filter(|s| !s.is_empty())
}

/// Applies general-info lines to a document.
///
/// `@tag.description` and `@tag.docs.*` attach to the most recent
/// `@tag.name`; lines before any tag are dropped.
pub struct GeneralInfoProcessor<'a> {
    document: &'a mut Document,
    last_tag: Option<usize>,
}

impl<'a> GeneralInfoProcessor<'a> {
    pub fn new(document: &'a mut Document) -> Self {
        Self {
            document,
            last_tag: None,
        }
    }

    /// Processes every line of a comment block.
    pub fn process_all<'l>(&mut self, lines: impl IntoIterator<Item = &'l str>) {
        for line in lines {
            self.process(line);
        }
    }

    /// Processes one line. Returns the directive name that handled it.
    pub fn process(&mut self, line: &str) -> Option<&'static str> {
        let line = line.trim();
        let matched = DIRECTIVES
            .iter()
            .find_map(|d| d.pattern.captures(line).map(|caps| (d, caps)));

        match matched {
            Some((directive, caps)) => {
                trace!("@{} <- {:?}", directive.name, line);
                (directive.handler)(self, &caps);
                Some(directive.name)
            }
            None => None,
        }
    }

    fn description(&mut self, caps: &Captures<'_>) {
        let line = text(caps, 1);
        match &mut self.document.info.description {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(&line);
            }
            None => self.document.info.description = Some(line),
        }
    }

    fn contact(&mut self) -> &mut Contact {
        self.document.info.contact.get_or_insert_with(Contact::default)
    }

    fn license(&mut self) -> &mut License {
        self.document.info.license.get_or_insert_with(License::default)
    }

    fn external_docs(&mut self) -> &mut ExternalDocs {
        self.document.external_docs.get_or_insert_with(ExternalDocs::default)
    }

    fn last_tag(&mut self) -> Option<&mut Tag> {
        self.last_tag.and_then(|i| self.document.tags.get_mut(i))
    }

    fn tag_name(&mut self, caps: &Captures<'_>) {
        self.document.tags.push(Tag {
            name: text(caps, 1),
            ..Default::default()
        });
        self.last_tag = Some(self.document.tags.len() - 1);
    }

    /// Sets or replaces the first server with `https://<host>`.
    fn host(&mut self, caps: &Captures<'_>) {
        let url = format!("https://{}", text(caps, 1));
        match self.document.servers.first_mut() {
            Some(server) => server.url = url,
            None => self.document.servers.push(Server {
                url,
                description: None,
            }),
        }
    }

    fn base_path(&mut self, caps: &Captures<'_>) {
        if let Some(server) = self.document.servers.first_mut() {
            let base = text(caps, 1);
            if server.url.ends_with('/') && base.starts_with('/') {
                server.url.push_str(&base[1..]);
            } else {
                server.url.push_str(&base);
            }
        }
    }

    /// Swaps the scheme of the first server for the first listed scheme.
    ///
    /// Only an `http://` or `https://` prefix is replaced; other URLs are left alone.
    fn schemes(&mut self, caps: &Captures<'_>) {
        let list = text(caps, 1);
        let Some(scheme) = list.split(|c: char| c == ',' || c.is_whitespace()).find(|s| !s.is_empty()) else {
            return;
        };
        if let Some(server) = self.document.servers.first_mut() {
            let rest = server
                .url
                .strip_prefix("https://")
                .or_else(|| server.url.strip_prefix("http://"));
            if let Some(rest) = rest {
                server.url = format!("{}://{}", scheme, rest);
            }
        }
    }

    fn basic_auth(&mut self, caps: &Captures<'_>) {
        self.document.components.security_schemes.insert(
            text(caps, 1),
            SecurityScheme {
                scheme_type: "http".to_string(),
                scheme: Some("basic".to_string()),
                description: optional(caps, 2),
                ..Default::default()
            },
        );
    }

    /// `@securityDefinitions.apikey <scheme> <param name> <location> [description]`
    fn api_key(&mut self, caps: &Captures<'_>) {
        self.document.components.security_schemes.insert(
            text(caps, 1),
            SecurityScheme {
                scheme_type: "apiKey".to_string(),
                name: Some(text(caps, 2)),
                location: Some(text(caps, 3)),
                description: optional(caps, 4),
                ..Default::default()
            },
        );
    }
}
