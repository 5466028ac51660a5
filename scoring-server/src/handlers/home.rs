//! Welcome page

use axum::response::Html;

const WELCOME: &str = "<h3>Bienvenue sur l'API de détection de fraude bancaire</h3>\
<p>Utilisez l'endpoint <code>/predict</code> avec POST pour analyser une transaction.</p>";

pub async fn index() -> Html<&'static str> {
    Html(WELCOME)
}
