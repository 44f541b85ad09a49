//! Embedded handlebars templates, one per deck kind plus the page shell
//! and the index page.

/// `(name, source)` pairs registered by [`HtmlRender`](crate::html::HtmlRender).
pub const TEMPLATES: [(&str, &str); 10] = [
    ("page", PAGE),
    ("index", INDEX),
    ("cover", COVER),
    ("table", TABLE),
    ("scard", SCALAR_CARDS),
    ("tcard", STATS_CARD),
    ("chart", CHART),
    ("news", NEWS),
    ("img", IMAGE),
    ("stock", RECORDS),
];

const PAGE: &str = r#"<!doctype html>
<html lang="zh-CN">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0, maximum-scale=1.0, user-scalable=no">
  <title>{{title}}</title>
  <link rel="stylesheet" href="dist/reset.css">
  <link rel="stylesheet" href="dist/reveal.css">
  <link rel="stylesheet" href="dist/theme/black.css">
  <script src="https://cdn.jsdelivr.net/npm/echarts@5/dist/echarts.min.js"></script>
  <style>
    .cards { display: flex; flex-wrap: wrap; justify-content: center; gap: 20px; margin-top: 20px; }
    .card { border: 1px solid #e0e0e0; border-radius: 8px; padding: 16px; min-width: 150px; text-align: center; }
    .chart { width: 1600px; height: 760px; margin: 0 auto; }
    .reveal table { font-size: 0.7em; }
  </style>
</head>
<body>
  <div class="reveal">
    <div class="slides">
{{{sections}}}
    </div>
  </div>
  <script id="chart-options" type="application/json">{{{chart_options}}}</script>
  <script src="dist/reveal.js"></script>
  <script>
    const CHART_OPTIONS = JSON.parse(document.getElementById("chart-options").textContent);
    Reveal.initialize({ hash: true, width: 1720, autoSlide: 5000, loop: true });
    document.querySelectorAll("[data-chart]").forEach(function (el) {
      const option = CHART_OPTIONS[el.dataset.chart];
      if (option) { echarts.init(el).setOption(option); }
    });
  </script>
</body>
</html>
"#;

const INDEX: &str = r#"<!doctype html>
<html lang="zh-CN">
<head>
  <meta charset="utf-8">
  <title>decklab</title>
</head>
<body>
  <h1>decklab</h1>
  <ul>
{{#each entries}}
    <li><a href="{{file}}">{{name}}</a> <small>{{updated}}</small></li>
{{/each}}
  </ul>
</body>
</html>
"#;

const COVER: &str = r#"<section>
  <h3>{{title}}</h3>
  <p>{{subtitle}}</p>
</section>"#;

const TABLE: &str = r#"<section>
{{#each pages}}
  <section>
    <h3>{{../title}}{{#if ../paged}} ({{page}}/{{../page_count}}){{/if}}</h3>
    <table>
      <thead><tr>{{#each ../columns}}<th>{{this}}</th>{{/each}}</tr></thead>
      <tbody>
{{#each rows}}
        <tr>{{#each this}}<td>{{this}}</td>{{/each}}</tr>
{{/each}}
      </tbody>
    </table>
  </section>
{{/each}}
</section>"#;

const SCALAR_CARDS: &str = r#"<section>
  <h3>{{title}}</h3>
  <div class="cards">
{{#each cards}}
    <div class="card"><h4>{{label}}</h4><p>{{value}}</p></div>
{{else}}
    <p>No data available</p>
{{/each}}
  </div>
</section>"#;

const STATS_CARD: &str = r#"<section>
  <h3>{{title}}</h3>
  <table>
    <thead><tr>{{#each columns}}<th>{{this}}</th>{{/each}}</tr></thead>
    <tbody>
{{#each pages}}
{{#each rows}}
      <tr>{{#each this}}<td>{{this}}</td>{{/each}}</tr>
{{/each}}
{{/each}}
    </tbody>
  </table>
</section>"#;

const CHART: &str = r#"<section>
  <h3>{{title}}</h3>
  <div class="chart" data-chart="{{key}}"></div>
</section>"#;

const NEWS: &str = r#"<section>
  <h3>{{title}}</h3>
  <p>{{excerpt}}</p>
{{#if published}}
  <p><small>{{published}}</small></p>
{{/if}}
</section>"#;

const IMAGE: &str = r#"{{#each images}}
<section>
  <h3>{{caption}}</h3>
  <img class="r-stretch" src="{{src}}" alt="{{caption}}">
</section>
{{/each}}"#;

const RECORDS: &str = r#"<section>
{{#each pages}}
  <section>
    <h3>{{../title}}</h3>
{{#each rows}}
    <div class="cards">
{{#each this}}
      <div class="card"><h4>{{label}}</h4><p>{{value}}</p></div>
{{/each}}
    </div>
{{/each}}
  </section>
{{/each}}
</section>"#;
