/*!
# Refocus DevKit - Stubs et Utilitaires pour tester le collector

Bibliothèque facilitant les tests du collector avec:
- Transport simulé (sans contrôleur réel)
- Dossiers de générateurs temporaires avec dates de modification contrôlées
- Contrôleur HTTP minimal pour tester le transport réel
- Harness pour enchaîner des cycles heartbeat
*/

pub mod controller_stub;
pub mod fixtures;
pub mod mock_transport;
pub mod test_utils;

pub use controller_stub::{ControllerStub, ReceivedHeartbeat};
pub use fixtures::GeneratorDir;
pub use mock_transport::{MockReply, MockTransport, SentHeartbeat};
pub use test_utils::TestHarness;
