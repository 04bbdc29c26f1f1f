//! Built-in page templates.
//!
//! Copy here is the launch copy. Editors change it through the admin panel;
//! changes to this file only reach pages or sections that have never been
//! stored.

use serde_json::json;

use crate::template::{PageTemplate, SectionTemplate, SectionType};

pub(crate) fn pages() -> Vec<PageTemplate> {
    vec![
        home(),
        services(),
        case_studies(),
        blog(),
        about(),
        faq(),
        contact(),
        privacy_policy(),
        terms_of_service(),
    ]
}

fn home() -> PageTemplate {
    PageTemplate::new("/", "Home")
        .meta(
            "Digital Marketing Agency | Growth-Focused Campaigns",
            "We help ambitious brands grow with SEO, paid media, content and conversion-focused web design.",
        )
        .with_section(
            SectionTemplate::new("hero", SectionType::Hero, 0)
                .title("Marketing that moves the numbers")
                .content("Strategy, creative and performance under one roof.")
                .metadata(json!({
                    "primaryCta": {"label": "Book a strategy call", "href": "/contact"},
                    "secondaryCta": {"label": "See our work", "href": "/case-studies"}
                })),
        )
        .with_section(
            SectionTemplate::new("services", SectionType::Services, 1)
                .title("What we do")
                .metadata(json!({
                    "items": [
                        {"title": "SEO", "description": "Technical audits, content strategy and link earning."},
                        {"title": "Paid Media", "description": "Search, social and programmatic campaigns built on clean data."},
                        {"title": "Web Design", "description": "Fast, accessible sites designed to convert."}
                    ]
                })),
        )
        .with_section(
            SectionTemplate::new("stats", SectionType::Stats, 2)
                .title("Results we are proud of")
                .metadata(json!({
                    "items": [
                        {"value": "150+", "label": "Clients served"},
                        {"value": "3.2x", "label": "Average ROAS"},
                        {"value": "92%", "label": "Client retention"}
                    ]
                })),
        )
        .with_section(
            SectionTemplate::new("testimonials", SectionType::Testimonials, 3)
                .title("What clients say")
                .metadata(json!({"items": []})),
        )
        .with_section(
            SectionTemplate::new("cta", SectionType::Cta, 4)
                .title("Ready to grow?")
                .content("Tell us about your goals and we will map out a plan.")
                .metadata(json!({"label": "Get in touch", "href": "/contact"})),
        )
}

fn services() -> PageTemplate {
    PageTemplate::new("/services", "Services")
        .meta(
            "Services | SEO, Paid Media, Content & Web Design",
            "Full-funnel digital marketing services tailored to your growth stage.",
        )
        .with_section(
            SectionTemplate::new("hero", SectionType::Hero, 0)
                .title("Services built around outcomes")
                .content("Pick a single channel or a fully managed growth program."),
        )
        .with_section(
            SectionTemplate::new("services", SectionType::Services, 1)
                .title("Our services")
                .metadata(json!({
                    "items": [
                        {"title": "Search Engine Optimization", "slug": "seo"},
                        {"title": "Pay-Per-Click Advertising", "slug": "ppc"},
                        {"title": "Social Media Marketing", "slug": "social"},
                        {"title": "Content Marketing", "slug": "content"},
                        {"title": "Web Design & Development", "slug": "web"},
                        {"title": "Email Marketing", "slug": "email"}
                    ]
                })),
        )
        .with_section(
            SectionTemplate::new("process", SectionType::Process, 2)
                .title("How we work")
                .metadata(json!({
                    "steps": ["Discover", "Plan", "Launch", "Optimize"]
                })),
        )
        .with_section(
            SectionTemplate::new("cta", SectionType::Cta, 3)
                .title("Not sure where to start?")
                .metadata(json!({"label": "Request a free audit", "href": "/contact"})),
        )
}

fn case_studies() -> PageTemplate {
    PageTemplate::new("/case-studies", "Case Studies")
        .meta(
            "Case Studies | Client Results",
            "How we helped brands across e-commerce, SaaS and local services grow.",
        )
        .with_section(
            SectionTemplate::new("hero", SectionType::Hero, 0)
                .title("Work that speaks for itself"),
        )
        .with_section(
            SectionTemplate::new("case_studies", SectionType::CaseStudies, 1)
                .title("Featured projects")
                .metadata(json!({"items": []})),
        )
        .with_section(
            SectionTemplate::new("cta", SectionType::Cta, 2)
                .title("Want results like these?")
                .metadata(json!({"label": "Start a project", "href": "/contact"})),
        )
}

fn blog() -> PageTemplate {
    PageTemplate::new("/blog", "Blog")
        .meta(
            "Blog | Marketing Insights",
            "Practical guides on SEO, advertising and conversion optimization.",
        )
        .with_section(
            SectionTemplate::new("hero", SectionType::Hero, 0)
                .title("Insights from the team")
                .content("Tactics and teardowns from campaigns we run every day."),
        )
}

fn about() -> PageTemplate {
    PageTemplate::new("/about", "About Us")
        .meta(
            "About Us | Our Team and Values",
            "A senior team of strategists, creatives and analysts.",
        )
        .with_section(
            SectionTemplate::new("hero", SectionType::Hero, 0)
                .title("We are growth partners, not vendors")
                .content("Founded by marketers who were tired of vanity metrics."),
        )
        .with_section(
            SectionTemplate::new("story", SectionType::Text, 1)
                .title("Our story")
                .content("We started as a two-person SEO shop and grew alongside our clients."),
        )
        .with_section(
            SectionTemplate::new("values", SectionType::Features, 2)
                .title("What we value")
                .metadata(json!({
                    "items": [
                        {"title": "Transparency", "description": "You see the same dashboards we do."},
                        {"title": "Accountability", "description": "We commit to numbers, not activity."},
                        {"title": "Curiosity", "description": "Every account is an experiment."}
                    ]
                })),
        )
        .with_section(
            SectionTemplate::new("team", SectionType::Team, 3)
                .title("Meet the team")
                .metadata(json!({"members": []})),
        )
}

fn faq() -> PageTemplate {
    PageTemplate::new("/faq", "FAQ")
        .meta(
            "FAQ | Working With Us",
            "Answers to common questions about pricing, timelines and reporting.",
        )
        .with_section(
            SectionTemplate::new("hero", SectionType::Hero, 0).title("Frequently asked questions"),
        )
        .with_section(
            SectionTemplate::new("general", SectionType::Faq, 1)
                .title("General")
                .metadata(json!({
                    "items": [
                        {"question": "How long until we see results?", "answer": "Paid campaigns show signal within weeks; SEO compounds over months."},
                        {"question": "Do you require long contracts?", "answer": "No. Engagements are month to month after an initial 90-day plan."}
                    ]
                })),
        )
        .with_section(
            SectionTemplate::new("pricing", SectionType::Faq, 2)
                .title("Pricing")
                .metadata(json!({
                    "items": [
                        {"question": "How do you price engagements?", "answer": "A fixed monthly retainer scoped to your goals."}
                    ]
                })),
        )
}

fn contact() -> PageTemplate {
    PageTemplate::new("/contact", "Contact")
        .meta(
            "Contact Us | Book a Strategy Call",
            "Tell us about your goals and get a tailored proposal.",
        )
        .with_section(
            SectionTemplate::new("hero", SectionType::Hero, 0)
                .title("Let's talk")
                .content("We reply to every enquiry within one business day."),
        )
        .with_section(
            SectionTemplate::new("contact", SectionType::Contact, 1)
                .title("Get in touch")
                .metadata(json!({
                    "email": "hello@example.com",
                    "phone": "",
                    "address": ""
                })),
        )
}

fn privacy_policy() -> PageTemplate {
    PageTemplate::new("/privacy-policy", "Privacy Policy")
        .meta("Privacy Policy", "How we collect, use and protect your data.")
        .with_section(
            SectionTemplate::new("policy", SectionType::Legal, 0)
                .title("Privacy Policy")
                .content("This policy explains what personal data we collect and why."),
        )
}

fn terms_of_service() -> PageTemplate {
    PageTemplate::new("/terms-of-service", "Terms of Service")
        .meta("Terms of Service", "The terms that govern use of this website.")
        .with_section(
            SectionTemplate::new("terms", SectionType::Legal, 0)
                .title("Terms of Service")
                .content("By using this website you agree to the following terms."),
        )
}
